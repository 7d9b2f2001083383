// ==========================================
// 质检点检表管理系统 - 报表 API
// ==========================================
// 职责: 透视矩阵构建与 CSV / XLSX 导出
// 一致性: 表头与记录在同一个读事务内读取
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::engine::report_pivot::{PivotMatrix, ReportPivotBuilder};
use crate::export::{
    content_type, export_file_name, ExportError, ExportFormat, ExportedFile, FlatCsvExporter,
    PivotCsvExporter, XlsxExporter,
};
use crate::repository::inspection_repo::{InspectionRepository, InspectionSnapshot};
use crate::repository::parameter_repo::ParameterCatalog;

// ==========================================
// ReportApi - 报表 API
// ==========================================
pub struct ReportApi {
    inspection_repo: Arc<InspectionRepository>,
    catalog: Arc<dyn ParameterCatalog>,
    config_manager: Arc<ConfigManager>,
}

impl ReportApi {
    /// # 参数
    /// - inspection_repo: 点检数据仓储（一致性读取）
    /// - catalog: 参数目录（外部只读）
    /// - config_manager: 报表语言等配置
    pub fn new(
        inspection_repo: Arc<InspectionRepository>,
        catalog: Arc<dyn ParameterCatalog>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            inspection_repo,
            catalog,
            config_manager,
        }
    }

    /// 构建透视矩阵
    ///
    /// # 返回
    /// - Err(ApiError::NotFound): 点检表不存在
    #[instrument(skip(self))]
    pub fn build_matrix(&self, checklist_id: i64) -> ApiResult<PivotMatrix> {
        let snapshot = self.load_snapshot(checklist_id)?;
        self.build_from_snapshot(snapshot)
    }

    /// 导出（当前时间命名）
    pub fn export(&self, checklist_id: i64, format: ExportFormat) -> ApiResult<ExportedFile> {
        self.export_at(checklist_id, format, chrono::Local::now().naive_local())
    }

    /// 导出为指定格式
    ///
    /// # 参数
    /// - now: 文件名时间戳
    #[instrument(skip(self))]
    pub fn export_at(
        &self,
        checklist_id: i64,
        format: ExportFormat,
        now: NaiveDateTime,
    ) -> ApiResult<ExportedFile> {
        let snapshot = self.load_snapshot(checklist_id)?;
        let inspect_code = snapshot.checklist.inspect_code.clone();

        let bytes = match format {
            ExportFormat::FlatCsv => {
                let locale = self.config_manager.get_report_locale()?;
                FlatCsvExporter::new(locale).export(&snapshot.checklist, &snapshot.records)?
            }
            ExportFormat::PivotCsv => {
                let matrix = self.build_from_snapshot(snapshot)?;
                PivotCsvExporter::new().export(&matrix)?
            }
            ExportFormat::Xlsx => {
                let matrix = self.build_from_snapshot(snapshot)?;
                XlsxExporter::new().export(&matrix)?
            }
        };

        let file = ExportedFile {
            file_name: export_file_name(&inspect_code, format, now),
            content_type: content_type(format),
            bytes,
        };
        info!(file_name = %file.file_name, size = file.bytes.len(), "报表已生成");
        Ok(file)
    }

    /// 导出并写入目录
    ///
    /// `dir` 为空时使用配置 `export.dir`，仍未配置则写入当前目录
    pub fn export_to_dir(
        &self,
        checklist_id: i64,
        format: ExportFormat,
        dir: Option<&Path>,
    ) -> ApiResult<PathBuf> {
        let file = self.export(checklist_id, format)?;

        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => self
                .config_manager
                .get_export_dir()?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        std::fs::create_dir_all(&dir).map_err(ExportError::from)?;

        let path = dir.join(&file.file_name);
        std::fs::write(&path, &file.bytes).map_err(ExportError::from)?;
        info!(path = %path.display(), "报表已写入");
        Ok(path)
    }

    fn load_snapshot(&self, checklist_id: i64) -> ApiResult<InspectionSnapshot> {
        self.inspection_repo
            .load_snapshot(checklist_id)?
            .ok_or_else(|| ApiError::NotFound(format!("点检表(id={})不存在", checklist_id)))
    }

    fn build_from_snapshot(&self, snapshot: InspectionSnapshot) -> ApiResult<PivotMatrix> {
        let catalogue = self.catalog.parameters_for(&snapshot.checklist.fg_code)?;
        let locale = self.config_manager.get_report_locale()?;
        Ok(ReportPivotBuilder::new(locale).build(snapshot.checklist, &snapshot.records, &catalogue))
    }
}
