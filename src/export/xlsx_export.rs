// ==========================================
// 质检点检表管理系统 - Excel 导出
// ==========================================
// 版式:
// - 第 1-3 行: 点检表信息（每行 4 项）
// - 第 4 行: 空行
// - 第 5 行: 固定列标题（纵向合并 2 行）+ 分组名（横向合并）
// - 第 6-8 行: 参数名 / (单位) / 上下限
// - 第 9 行起: 数据行，按判定结果着色（不合格优先）
// ==========================================

use crate::domain::types::CellHint;
use crate::engine::report_pivot::{PivotMatrix, FIXED_COLUMN_COUNT};
use crate::export::ExportResult;
use crate::i18n::{normalize_locale, t_for};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

/// 信息区行数
const INFO_ROWS: u32 = 3;
/// 表头起始行（信息区 + 空行）
const HEADER_ROW: u32 = INFO_ROWS + 1;
/// 数据起始行
const DATA_ROW: u32 = HEADER_ROW + 4;
/// 最小列宽
const MIN_COLUMN_WIDTH: usize = 10;

const FILL_GROUP: u32 = 0xD9D9D9;
const FILL_SUBHEADER: u32 = 0xF2F2F2;
const FILL_PASS: u32 = 0xD1E7DD;
const FILL_FAIL: u32 = 0xF8D7DA;

/// 单元格样式集合
struct Styles {
    info: Format,
    group: Format,
    subheader: Format,
    plain: Format,
    pass: Format,
    fail: Format,
}

impl Styles {
    fn new() -> Self {
        let bordered = || {
            Format::new()
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin)
        };
        Self {
            info: Format::new().set_bold(),
            group: bordered()
                .set_bold()
                .set_background_color(Color::RGB(FILL_GROUP)),
            subheader: bordered().set_background_color(Color::RGB(FILL_SUBHEADER)),
            plain: bordered(),
            pass: bordered().set_background_color(Color::RGB(FILL_PASS)),
            fail: bordered().set_background_color(Color::RGB(FILL_FAIL)),
        }
    }

    fn for_hint(&self, hint: CellHint) -> &Format {
        match hint {
            CellHint::Fail => &self.fail,
            CellHint::Pass => &self.pass,
            CellHint::Neutral => &self.plain,
        }
    }
}

// ==========================================
// XlsxExporter - Excel 导出器
// ==========================================
pub struct XlsxExporter;

impl XlsxExporter {
    pub fn new() -> Self {
        Self
    }

    /// 导出透视矩阵为 xlsx 字节流
    pub fn export(&self, matrix: &PivotMatrix) -> ExportResult<Vec<u8>> {
        let locale = normalize_locale(&matrix.locale);
        let styles = Styles::new();
        let mut widths = vec![MIN_COLUMN_WIDTH; matrix.column_count()];

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(t_for(locale, "report.sheet_name"))?;

        write_info_block(sheet, matrix, locale, &styles.info)?;
        write_header(sheet, matrix, locale, &styles, &mut widths)?;

        // 数据行
        for (i, row) in matrix.rows.iter().enumerate() {
            let r = DATA_ROW + i as u32;
            for (c, text) in [&row.shift, &row.time, &row.note].into_iter().enumerate() {
                sheet.write_string_with_format(r, c as u16, text, &styles.plain)?;
                track_width(&mut widths, c, text);
            }
            for (j, cell) in row.cells.iter().enumerate() {
                let c = FIXED_COLUMN_COUNT + j;
                match cell {
                    Some(cell) => {
                        sheet.write_string_with_format(
                            r,
                            c as u16,
                            &cell.value,
                            styles.for_hint(cell.hint),
                        )?;
                        track_width(&mut widths, c, &cell.value);
                    }
                    None => {
                        sheet.write_blank(r, c as u16, &styles.plain)?;
                    }
                }
            }
        }

        for (c, width) in widths.iter().enumerate() {
            sheet.set_column_width(c as u16, *width as f64)?;
        }

        let bytes = workbook.save_to_buffer()?;
        tracing::debug!(
            inspect_code = %matrix.checklist.inspect_code,
            rows = matrix.rows.len(),
            columns = matrix.column_count(),
            size = bytes.len(),
            "Excel 导出完成"
        );
        Ok(bytes)
    }
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// 信息区: 销售订单 / 生产订单 / 工厂机台 各一行
fn write_info_block(
    sheet: &mut Worksheet,
    matrix: &PivotMatrix,
    locale: &str,
    format: &Format,
) -> ExportResult<()> {
    let c = &matrix.checklist;
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let machine = c
        .machine_name
        .clone()
        .unwrap_or_else(|| t_for(locale, "report.not_available"));

    let lines: [[(&str, String); 4]; INFO_ROWS as usize] = [
        [
            ("report.sales_order", opt(&c.so_number)),
            ("report.sales_order_item", opt(&c.sales_order_item)),
            ("report.customer_code", opt(&c.customer_code)),
            ("report.customer_name", c.customer.clone()),
        ],
        [
            ("report.production_order", opt(&c.production_order)),
            ("report.material_code", c.fg_code.clone()),
            ("report.material_name", c.item_name.clone()),
            ("report.size", opt(&c.size)),
        ],
        [
            ("report.film_type", opt(&c.type_of_film)),
            ("report.plant", c.plant.clone()),
            ("report.zone", c.machine_zone.clone()),
            ("report.machine", machine),
        ],
    ];

    for (r, line) in lines.iter().enumerate() {
        for (col, (key, value)) in line.iter().enumerate() {
            let text = format!("{}: {}", t_for(locale, key), value);
            sheet.write_string_with_format(r as u32, col as u16, &text, format)?;
        }
    }
    Ok(())
}

/// 表头: 固定列 + 分组 + 参数名 / 单位 / 上下限
fn write_header(
    sheet: &mut Worksheet,
    matrix: &PivotMatrix,
    locale: &str,
    styles: &Styles,
    widths: &mut [usize],
) -> ExportResult<()> {
    let fixed = [
        t_for(locale, "report.shift"),
        t_for(locale, "report.time"),
        t_for(locale, "report.lot"),
    ];
    for (c, label) in fixed.iter().enumerate() {
        sheet.merge_range(HEADER_ROW, c as u16, HEADER_ROW + 1, c as u16, label, &styles.group)?;
        track_width(widths, c, label);
    }

    let mut col = FIXED_COLUMN_COUNT;
    for group in &matrix.groups {
        let first = col as u16;
        let last = (col + group.columns.len().saturating_sub(1)) as u16;
        if last > first {
            sheet.merge_range(HEADER_ROW, first, HEADER_ROW, last, &group.name, &styles.group)?;
        } else {
            sheet.write_string_with_format(HEADER_ROW, first, &group.name, &styles.group)?;
        }

        for column in &group.columns {
            let unit = column.unit_label();
            let range = column.range_note.clone().unwrap_or_default();
            sheet.write_string_with_format(HEADER_ROW + 1, col as u16, &column.name, &styles.subheader)?;
            sheet.write_string_with_format(HEADER_ROW + 2, col as u16, &unit, &styles.subheader)?;
            sheet.write_string_with_format(HEADER_ROW + 3, col as u16, &range, &styles.subheader)?;
            for text in [&column.name, &unit, &range] {
                track_width(widths, col, text);
            }
            col += 1;
        }
    }
    Ok(())
}

fn track_width(widths: &mut [usize], col: usize, text: &str) {
    if let Some(w) = widths.get_mut(col) {
        *w = (*w).max(text.chars().count() + 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checklist::Checklist;
    use crate::domain::types::ChecklistStatus;
    use crate::engine::report_pivot::{ColumnGroup, ParameterColumn, PivotCell, PivotRow};
    use crate::domain::types::MeasurementKind;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn matrix() -> PivotMatrix {
        let checklist = Checklist {
            checklist_id: 1,
            inspect_code: "KBA2512220001".into(),
            fg_code: "FG001".into(),
            item_name: "Shrink Film".into(),
            customer: "ACME".into(),
            customer_code: Some("C-01".into()),
            so_number: Some("SO-9".into()),
            sales_order_item: None,
            production_order: None,
            size: None,
            type_of_film: None,
            plant: "KB".into(),
            process: "BLOW".into(),
            machine_zone: "A".into(),
            machine_process: None,
            machine_name: None,
            machine_storage: None,
            doc_data_type: None,
            status: ChecklistStatus::Active,
            created_at: NaiveDate::from_ymd_opt(2025, 12, 22)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            created_by: None,
            completed_at: None,
            completed_by: None,
            remark: None,
            inspector: None,
            approver: None,
            inspector_team_a: None,
            inspector_team_b: None,
        };
        let column = |key: &str, name: &str| ParameterColumn {
            parameter_key: key.into(),
            name: name.into(),
            unit: "mm".into(),
            kind: MeasurementKind::Number,
            range_note: None,
        };
        PivotMatrix {
            checklist,
            locale: "en".into(),
            groups: vec![
                ColumnGroup {
                    name: "Blow".into(),
                    columns: vec![column("param_1", "Thickness"), column("param_2", "Width")],
                },
                ColumnGroup {
                    name: "Cut".into(),
                    columns: vec![column("param_3", "Length")],
                },
            ],
            rows: vec![PivotRow {
                record_id: 1,
                shift: "A".into(),
                time: "08:30".into(),
                note: "LOT-1".into(),
                cells: vec![
                    Some(PivotCell {
                        value: "44.2".into(),
                        hint: CellHint::Pass,
                    }),
                    None,
                    Some(PivotCell {
                        value: "120".into(),
                        hint: CellHint::Fail,
                    }),
                ],
            }],
        }
    }

    #[test]
    fn test_xlsx_layout_read_back() {
        let bytes = XlsxExporter::new().export(&matrix()).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("QC Inspection").unwrap();

        let text = |r: u32, c: u32| match range.get_value((r, c)) {
            Some(Data::String(s)) => s.clone(),
            _ => String::new(),
        };

        assert_eq!(text(0, 0), "Sales Order: SO-9");
        assert_eq!(text(0, 3), "Customer Name: ACME");
        assert_eq!(text(2, 3), "Machine: N/A");
        assert_eq!(text(4, 0), "Shift");
        assert_eq!(text(4, 3), "Blow");
        assert_eq!(text(4, 5), "Cut");
        assert_eq!(text(5, 4), "Width");
        assert_eq!(text(6, 3), "(mm)");
        assert_eq!(text(8, 0), "A");
        assert_eq!(text(8, 3), "44.2");
        assert_eq!(text(8, 4), "");
        assert_eq!(text(8, 5), "120");
    }

    #[test]
    fn test_track_width_has_floor() {
        let mut widths = vec![MIN_COLUMN_WIDTH; 2];
        track_width(&mut widths, 0, "abc");
        track_width(&mut widths, 1, "a much longer header text");
        assert_eq!(widths[0], MIN_COLUMN_WIDTH);
        assert_eq!(widths[1], 27);
        track_width(&mut widths, 5, "out of range");
    }
}
