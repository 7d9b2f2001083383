// ==========================================
// 质检点检表管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行及上层调用
// ==========================================

pub mod checklist_api;
pub mod error;
pub mod report_api;

// 重导出核心类型
pub use checklist_api::ChecklistApi;
pub use error::{ApiError, ApiResult, FailureKind};
pub use report_api::ReportApi;
