// ==========================================
// 质检点检表管理系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// - 检验编码分配 (CodeAllocator)
// - 测量判定 (MeasurementClassifier)
// - 报表透视 (ReportPivotBuilder)
// ==========================================

pub mod classifier;
pub mod code_allocator;
pub mod report_pivot;

// 重导出核心引擎
pub use classifier::{Classification, ClassifyError, ClassifyInput, MeasurementClassifier, MeasurementSpec};
pub use code_allocator::{AllocationError, AllocationPolicy, CodeAllocator, CodeStore};
pub use report_pivot::{
    ColumnGroup, ParameterColumn, PivotCell, PivotMatrix, PivotRow, ReportPivotBuilder,
    FIXED_COLUMN_COUNT,
};
