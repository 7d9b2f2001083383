// ==========================================
// 质检点检表管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod checklist;
pub mod inspection;
pub mod parameter;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use checklist::{
    pass_rate_percent, Checklist, ChecklistFilter, ChecklistSummary, DailyCodeStat, NewChecklist,
};
pub use inspection::{
    HeaderUpdate, InspectionBatch, InspectionRecord, InspectionRowInput, Measurement,
    MeasurementInput, PreparedMeasurement, PreparedRecord, SaveInspectionRequest, SaveOutcome,
};
pub use parameter::{CatalogParameter, PARAMETER_KEY_PREFIX};
pub use types::{CellHint, ChecklistStatus, MeasurementKind, Shift};
