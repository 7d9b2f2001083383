// ==========================================
// 质检点检表管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换仓储 / 引擎 / 导出错误为用户可读的错误消息
// 分类: AllocationExhausted / ValidationFailure / NotFound / StorageFailure
// ==========================================

use crate::engine::classifier::ClassifyError;
use crate::engine::code_allocator::AllocationError;
use crate::export::ExportError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 编码分配错误
    // ==========================================
    #[error("检验编码分配失败: {0}")]
    AllocationExhausted(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导出错误
    // ==========================================
    #[error("报表导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

/// 错误分类（对外暴露的四类失败）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    AllocationExhausted,
    ValidationFailure,
    NotFound,
    StorageFailure,
}

impl ApiError {
    /// 映射到四类失败
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::AllocationExhausted(_) => FailureKind::AllocationExhausted,
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::InvalidStateTransition { .. } => FailureKind::ValidationFailure,
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::ExportError(_)
            | ApiError::InternalError(_) => FailureKind::StorageFailure,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("检查约束违反: {}", msg))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段{}值异常: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidCodePart { .. } => ApiError::InvalidInput(err.to_string()),
            AllocationError::Exhausted { .. } | AllocationError::SequenceOverflow { .. } => {
                ApiError::AllocationExhausted(err.to_string())
            }
            AllocationError::Storage(e) => ApiError::from(e),
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_kinds() {
        let not_found: ApiError = RepositoryError::NotFound {
            entity: "Checklist".to_string(),
            id: "7".to_string(),
        }
        .into();
        assert_eq!(not_found.kind(), FailureKind::NotFound);

        let check: ApiError = RepositoryError::CheckConstraintViolation("is_pass".to_string()).into();
        assert_eq!(check.kind(), FailureKind::StorageFailure);

        let transition: ApiError = RepositoryError::InvalidStateTransition {
            from: "Completed".to_string(),
            to: "Cancelled".to_string(),
        }
        .into();
        assert_eq!(transition.kind(), FailureKind::ValidationFailure);
    }

    #[test]
    fn test_allocation_error_kinds() {
        let exhausted: ApiError = AllocationError::Exhausted {
            prefix: "KBA251222".to_string(),
            attempts: 5,
        }
        .into();
        assert_eq!(exhausted.kind(), FailureKind::AllocationExhausted);

        let overflow: ApiError = AllocationError::SequenceOverflow {
            prefix: "KBA251222".to_string(),
        }
        .into();
        assert_eq!(overflow.kind(), FailureKind::AllocationExhausted);

        let invalid: ApiError = AllocationError::InvalidCodePart {
            field: "plant",
            value: "K".to_string(),
            reason: "必须为 2 位字母或数字",
        }
        .into();
        assert_eq!(invalid.kind(), FailureKind::ValidationFailure);

        let storage: ApiError =
            AllocationError::Storage(RepositoryError::LockError("poisoned".to_string())).into();
        assert_eq!(storage.kind(), FailureKind::StorageFailure);
    }

    #[test]
    fn test_classify_error_is_validation() {
        let err: ApiError = ClassifyError::ConflictingVerdict.into();
        assert_eq!(err.kind(), FailureKind::ValidationFailure);
    }
}
