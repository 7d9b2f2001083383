// ==========================================
// 质检点检表管理系统 - CSV 导出
// ==========================================
// 透视 CSV: 4 行表头（分组 / 参数名 / 单位 / 上下限）+ 数据行
// 扁平 CSV: 每条测量一行
// ==========================================

use crate::domain::checklist::Checklist;
use crate::domain::inspection::InspectionRecord;
use crate::domain::types::MeasurementKind;
use crate::engine::report_pivot::{PivotMatrix, FIXED_COLUMN_COUNT};
use crate::export::{ExportError, ExportResult};
use crate::i18n::{normalize_locale, t_for};

/// 写出为 UTF-8 字节
fn finish(writer: csv::Writer<Vec<u8>>) -> ExportResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

// ==========================================
// PivotCsvExporter - 透视 CSV
// ==========================================
pub struct PivotCsvExporter;

impl PivotCsvExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, matrix: &PivotMatrix) -> ExportResult<Vec<u8>> {
        let locale = normalize_locale(&matrix.locale);
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(Vec::new());
        let width = matrix.column_count();

        // 第 1 行: 固定列标题 + 分组名（仅写在分组首列）
        let mut line = Vec::with_capacity(width);
        line.push(t_for(locale, "report.shift"));
        line.push(t_for(locale, "report.time"));
        line.push(t_for(locale, "report.lot"));
        for group in &matrix.groups {
            for (i, _) in group.columns.iter().enumerate() {
                line.push(if i == 0 { group.name.clone() } else { String::new() });
            }
        }
        writer.write_record(&line)?;

        // 第 2-4 行: 参数名 / 单位 / 上下限
        let blank = || vec![String::new(); FIXED_COLUMN_COUNT];

        let mut names = blank();
        names.extend(matrix.columns().map(|c| c.name.clone()));
        writer.write_record(&names)?;

        let mut units = blank();
        units.extend(matrix.columns().map(|c| c.unit_label()));
        writer.write_record(&units)?;

        let mut ranges = blank();
        ranges.extend(matrix.columns().map(|c| c.range_note.clone().unwrap_or_default()));
        writer.write_record(&ranges)?;

        // 数据行
        for row in &matrix.rows {
            let mut line = Vec::with_capacity(width);
            line.push(row.shift.clone());
            line.push(row.time.clone());
            line.push(row.note.clone());
            line.extend(
                row.cells
                    .iter()
                    .map(|c| c.as_ref().map(|cell| cell.value.clone()).unwrap_or_default()),
            );
            writer.write_record(&line)?;
        }

        finish(writer)
    }
}

impl Default for PivotCsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// FlatCsvExporter - 扁平 CSV
// ==========================================
pub struct FlatCsvExporter {
    locale: &'static str,
}

impl FlatCsvExporter {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: normalize_locale(locale),
        }
    }

    /// 列: 日期, FG, 产品, 客户, 班次, 时间, 参数, 值, 单位, 类型, 结果, 检验员, 备注
    pub fn export(&self, checklist: &Checklist, records: &[InspectionRecord]) -> ExportResult<Vec<u8>> {
        let l = self.locale;
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record([
            t_for(l, "flat.date"),
            t_for(l, "flat.fg_code"),
            t_for(l, "flat.item"),
            t_for(l, "flat.customer"),
            t_for(l, "report.shift"),
            t_for(l, "report.time"),
            t_for(l, "flat.parameter"),
            t_for(l, "flat.value"),
            t_for(l, "flat.unit"),
            t_for(l, "flat.kind"),
            t_for(l, "flat.result"),
            t_for(l, "flat.inspector"),
            t_for(l, "flat.note"),
        ])?;

        let kind_measure = t_for(l, "flat.kind_measure");
        let kind_check = t_for(l, "flat.kind_check");
        let result_pass = t_for(l, "flat.result_pass");
        let result_fail = t_for(l, "flat.result_fail");
        let result_na = t_for(l, "flat.result_na");

        let date = checklist.created_at.format("%Y-%m-%d").to_string();
        let inspector = checklist.inspector.clone().unwrap_or_default();

        for record in records {
            let time = record.time_label();
            let note = record.note.clone().unwrap_or_default();
            for m in &record.measurements {
                let kind = match m.kind {
                    MeasurementKind::Number => &kind_measure,
                    _ => &kind_check,
                };
                let result = if m.is_pass {
                    &result_pass
                } else if m.is_fail {
                    &result_fail
                } else {
                    &result_na
                };
                writer.write_record([
                    date.as_str(),
                    checklist.fg_code.as_str(),
                    checklist.item_name.as_str(),
                    checklist.customer.as_str(),
                    record.shift.as_str(),
                    time.as_str(),
                    m.parameter_name.as_str(),
                    m.value.as_deref().unwrap_or(""),
                    m.unit.as_deref().unwrap_or(""),
                    kind.as_str(),
                    result.as_str(),
                    inspector.as_str(),
                    note.as_str(),
                ])?;
            }
        }

        finish(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inspection::Measurement;
    use crate::domain::parameter::CatalogParameter;
    use crate::domain::types::{ChecklistStatus, Shift};
    use crate::engine::report_pivot::ReportPivotBuilder;
    use chrono::{NaiveDate, NaiveTime};

    fn checklist() -> Checklist {
        Checklist {
            checklist_id: 1,
            inspect_code: "KBA2512220001".into(),
            fg_code: "FG001".into(),
            item_name: "Shrink Film, clear".into(),
            customer: "ACME".into(),
            customer_code: None,
            so_number: None,
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
            inspector: Some("somchai".into()),
            approver: None,
            inspector_team_a: None,
            inspector_team_b: None,
        }
    }

    fn records() -> Vec<InspectionRecord> {
        let m = |pid: &str, kind, value: &str, p, f| Measurement {
            measurement_id: 0,
            record_id: 1,
            parameter_id: pid.into(),
            parameter_name: format!("P-{}", pid),
            kind,
            value: Some(value.into()),
            numeric_value: None,
            unit: Some("mm".into()),
            is_pass: p,
            is_fail: f,
            min_value: None,
            max_value: None,
            standard_value: None,
        };
        vec![InspectionRecord {
            record_id: 1,
            checklist_id: 1,
            shift: Shift::A,
            inspection_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            note: Some("LOT-1".into()),
            created_at: NaiveDate::from_ymd_opt(2025, 12, 22)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            created_by: None,
            measurements: vec![
                m("param_1", MeasurementKind::Number, "44.2", true, false),
                m("param_2", MeasurementKind::PassFail, "", false, false),
                m("param_3", MeasurementKind::LeftRight, "L", true, false),
            ],
        }]
    }

    fn read_all(bytes: Vec<u8>) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_flat_csv_thai_labels() {
        let bytes = FlatCsvExporter::new("th").export(&checklist(), &records()).unwrap();
        let rows = read_all(bytes);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0], "วันที่");
        assert_eq!(rows[0][4], "กะ");
        assert_eq!(
            rows[1],
            vec![
                "2025-12-22", "FG001", "Shrink Film, clear", "ACME", "A", "08:30", "P-param_1",
                "44.2", "mm", "วัดค่า", "ผ่าน", "somchai", "LOT-1"
            ]
        );
        assert_eq!(rows[2][9], "ตรวจสอบ");
        assert_eq!(rows[2][10], "N/A");
        assert_eq!(rows[3][10], "ผ่าน");
    }

    #[test]
    fn test_pivot_csv_layout() {
        let catalogue = vec![
            CatalogParameter {
                id: 1,
                fg_code: "FG001".into(),
                name: "Thickness".into(),
                unit: "micron".into(),
                kind: MeasurementKind::Number,
                min: 38.1,
                max: 50.8,
                standard: 44.45,
                data_type_group: Some("เป่า".into()),
                sort_order: 1,
                hidden: false,
            },
            CatalogParameter {
                id: 2,
                fg_code: "FG001".into(),
                name: "Seal".into(),
                unit: "-".into(),
                kind: MeasurementKind::PassFail,
                min: 0.0,
                max: 0.0,
                standard: 0.0,
                data_type_group: Some("เป่า".into()),
                sort_order: 2,
                hidden: false,
            },
        ];
        let matrix = ReportPivotBuilder::new("en").build(checklist(), &records(), &catalogue);
        let rows = read_all(PivotCsvExporter::new().export(&matrix).unwrap());

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], vec!["Shift", "Time", "Lot", "เป่า", ""]);
        assert_eq!(rows[1], vec!["", "", "", "Thickness", "Seal"]);
        assert_eq!(rows[2], vec!["", "", "", "(micron)", "(-)"]);
        assert_eq!(rows[3], vec!["", "", "", "min: 38.1 | Max: 50.8", ""]);
        assert_eq!(rows[4], vec!["A", "08:30", "LOT-1", "44.2", ""]);
    }
}
