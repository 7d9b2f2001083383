// ==========================================
// 质检点检表管理系统 - 报表导出层
// ==========================================
// 职责: 透视矩阵 / 点检记录 → CSV / XLSX 字节流
// 红线: 只做格式化，不读库，不做判定
// ==========================================

pub mod csv_export;
pub mod xlsx_export;

use chrono::NaiveDateTime;
use thiserror::Error;

pub use csv_export::{FlatCsvExporter, PivotCsvExporter};
pub use xlsx_export::XlsxExporter;

/// 导出错误
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel 写入失败: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    PivotCsv,
    FlatCsv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::PivotCsv | ExportFormat::FlatCsv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// 导出文件
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 导出文件名
///
/// - XLSX: QC_Inspection_{code}_{yyyyMMdd_HHmmss}.xlsx
/// - 扁平 CSV: QC_Inspection_{code}_{yyyyMMdd}.csv
/// - 透视 CSV: QC_Inspection_{code}_{yyyyMMdd_HHmmss}_pivot.csv
pub fn export_file_name(inspect_code: &str, format: ExportFormat, now: NaiveDateTime) -> String {
    match format {
        ExportFormat::Xlsx => format!(
            "QC_Inspection_{}_{}.xlsx",
            inspect_code,
            now.format("%Y%m%d_%H%M%S")
        ),
        ExportFormat::FlatCsv => format!("QC_Inspection_{}_{}.csv", inspect_code, now.format("%Y%m%d")),
        ExportFormat::PivotCsv => format!(
            "QC_Inspection_{}_{}_pivot.csv",
            inspect_code,
            now.format("%Y%m%d_%H%M%S")
        ),
    }
}

pub fn content_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::PivotCsv | ExportFormat::FlatCsv => "text/csv",
        ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_export_file_name() {
        let now = NaiveDate::from_ymd_opt(2025, 12, 22)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        assert_eq!(
            export_file_name("KBA2512220001", ExportFormat::Xlsx, now),
            "QC_Inspection_KBA2512220001_20251222_140509.xlsx"
        );
        assert_eq!(
            export_file_name("KBA2512220001", ExportFormat::FlatCsv, now),
            "QC_Inspection_KBA2512220001_20251222.csv"
        );
    }
}
