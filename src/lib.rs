// ==========================================
// 质检点检表管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 核心: 检验编码分配 / 点检数据原子替换 / 合格判定与报表透视
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导出层 - CSV / Excel
pub mod export;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CellHint, ChecklistStatus, MeasurementKind, Shift};

// 领域实体
pub use domain::{
    ActionLog, ActionType, CatalogParameter, Checklist, ChecklistFilter, ChecklistSummary,
    InspectionRecord, Measurement, NewChecklist, SaveInspectionRequest, SaveOutcome,
};

// 引擎
pub use engine::{CodeAllocator, MeasurementClassifier, PivotMatrix, ReportPivotBuilder};

// 导出
pub use export::{ExportFormat, ExportedFile};

// API
pub use api::{ApiError, ApiResult, ChecklistApi, FailureKind, ReportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "质检点检表管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
