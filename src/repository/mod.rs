// ==========================================
// 质检点检表管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod checklist_repo;
pub mod error;
pub mod inspection_repo;
pub mod parameter_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use checklist_repo::ChecklistRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inspection_repo::{InspectionRepository, InspectionSnapshot};
pub use parameter_repo::{ParameterCatalog, ParameterRepository};

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Row;

/// 读取 TEXT 时间戳列
pub(crate) fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, crate::db::TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 读取可空 TEXT 时间戳列
pub(crate) fn get_opt_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, crate::db::TS_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// 读取 TEXT 时间列 (HH:MM:SS)
pub(crate) fn get_time(row: &Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, crate::db::TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 读取字符串枚举列
pub(crate) fn get_enum<T, F>(row: &Row, idx: usize, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Option<T>,
{
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("无法识别的枚举值: {}", raw).into(),
        )
    })
}
