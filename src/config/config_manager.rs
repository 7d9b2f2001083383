// ==========================================
// 质检点检表管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// 全局作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// 默认值
// ==========================================
pub const DEFAULT_ALLOCATION_MAX_ATTEMPTS: u32 = 5;
pub const MIN_ALLOCATION_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_ALLOCATION_BACKOFF_MS: u64 = 100;
/// 报表默认语言（泰文表头: กะ / เวลา / lot）
pub const DEFAULT_REPORT_LOCALE: &str = "th";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 读取并解析配置，缺失或解析失败时回退默认值
    fn get_parsed_or_default<T: FromStr + Copy>(&self, key: &str, default: T) -> RepositoryResult<T> {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(key = key, value = %raw, "配置值无法解析，使用默认值");
                Ok(default)
            }
        }
    }

    // ===== 编码分配 =====

    /// 编码分配最大尝试次数（不小于 2）
    pub fn get_allocation_max_attempts(&self) -> RepositoryResult<u32> {
        let v = self.get_parsed_or_default(
            config_keys::ALLOCATION_MAX_ATTEMPTS,
            DEFAULT_ALLOCATION_MAX_ATTEMPTS,
        )?;
        Ok(v.max(MIN_ALLOCATION_MAX_ATTEMPTS))
    }

    /// 编码冲突重试间隔
    pub fn get_allocation_backoff(&self) -> RepositoryResult<Duration> {
        let ms = self.get_parsed_or_default(
            config_keys::ALLOCATION_BACKOFF_MS,
            DEFAULT_ALLOCATION_BACKOFF_MS,
        )?;
        Ok(Duration::from_millis(ms))
    }

    // ===== 报表 =====

    /// 报表语言（规范化为 zh-CN / en / th；未配置时为泰文）
    pub fn get_report_locale(&self) -> RepositoryResult<&'static str> {
        let raw = self.get_global_config_value(config_keys::REPORT_LOCALE)?;
        Ok(raw
            .as_deref()
            .map(crate::i18n::normalize_locale)
            .unwrap_or(DEFAULT_REPORT_LOCALE))
    }

    /// 导出目录（未配置时为 None，由调用方决定）
    pub fn get_export_dir(&self) -> RepositoryResult<Option<String>> {
        Ok(self
            .get_global_config_value(config_keys::EXPORT_DIR)?
            .filter(|v| !v.trim().is_empty()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 编码分配
    pub const ALLOCATION_MAX_ATTEMPTS: &str = "allocation.max_attempts";
    pub const ALLOCATION_BACKOFF_MS: &str = "allocation.backoff_ms";

    // 报表
    pub const REPORT_LOCALE: &str = "report.locale";
    pub const EXPORT_DIR: &str = "export.dir";
}
