use crate::db::TS_FORMAT;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 参数
    /// - `log`: 操作日志实体
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_action_log(&conn, log)
    }
}

/// 在给定连接（或事务）上插入操作日志
///
/// 供其他仓储在同一事务内写审计记录
pub(crate) fn insert_action_log(conn: &Connection, log: &ActionLog) -> RepositoryResult<String> {
    conn.execute(
        r#"
        INSERT INTO action_log (
            action_id, checklist_id, inspect_code, action_type,
            action_ts, actor, payload_json, detail
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            log.action_id,
            log.checklist_id,
            log.inspect_code,
            log.action_type,
            log.action_ts.format(TS_FORMAT).to_string(),
            log.actor,
            log.payload_json.as_ref().map(|v| v.to_string()),
            log.detail,
        ],
    )?;

    Ok(log.action_id.clone())
}
