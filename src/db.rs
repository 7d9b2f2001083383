// ==========================================
// 质检点检表管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，外键约束在每个连接上都开启
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 数据库时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 点检时间存储格式
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表 DDL
///
/// 约束:
/// - inspect_code 全局唯一；已发放编码记入 issued_code，删除点检表后不回收
/// - is_pass / is_fail 不可同时为 1
/// - 删除点检表级联删除记录与测量数据
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS inspection_checklist (
    checklist_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    inspect_code      TEXT NOT NULL UNIQUE,
    fg_code           TEXT NOT NULL,
    item_name         TEXT NOT NULL,
    customer          TEXT NOT NULL,
    customer_code     TEXT,
    so_number         TEXT,
    sales_order_item  TEXT,
    production_order  TEXT,
    size              TEXT,
    type_of_film      TEXT,
    plant             TEXT NOT NULL,
    process           TEXT NOT NULL,
    machine_zone      TEXT NOT NULL,
    machine_process   TEXT,
    machine_name      TEXT,
    machine_storage   TEXT,
    doc_data_type     TEXT,
    status            TEXT NOT NULL DEFAULT 'Active'
                      CHECK (status IN ('Active', 'Completed', 'Cancelled')),
    created_at        TEXT NOT NULL,
    created_by        TEXT,
    completed_at      TEXT,
    completed_by      TEXT,
    remark            TEXT,
    inspector         TEXT,
    approver          TEXT,
    inspector_team_a  TEXT,
    inspector_team_b  TEXT
);

CREATE TABLE IF NOT EXISTS issued_code (
    inspect_code      TEXT PRIMARY KEY,
    issued_at         TEXT NOT NULL
);

-- v1 库升级: 补登已存在点检表的编码
INSERT OR IGNORE INTO issued_code (inspect_code, issued_at)
    SELECT inspect_code, created_at FROM inspection_checklist;

CREATE TABLE IF NOT EXISTS inspection_record (
    record_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    checklist_id      INTEGER NOT NULL
                      REFERENCES inspection_checklist(checklist_id) ON DELETE CASCADE,
    shift             TEXT NOT NULL CHECK (shift IN ('A', 'B', 'C')),
    inspection_time   TEXT NOT NULL,
    note              TEXT,
    created_at        TEXT NOT NULL,
    created_by        TEXT
);

CREATE INDEX IF NOT EXISTS idx_record_checklist
    ON inspection_record(checklist_id, created_at, record_id);

CREATE TABLE IF NOT EXISTS inspection_measurement (
    measurement_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id         INTEGER NOT NULL
                      REFERENCES inspection_record(record_id) ON DELETE CASCADE,
    parameter_id      TEXT NOT NULL CHECK (length(parameter_id) > 0),
    parameter_name    TEXT NOT NULL,
    kind              TEXT NOT NULL CHECK (kind IN ('number', 'leftright', 'passfail')),
    value             TEXT,
    numeric_value     REAL,
    unit              TEXT,
    pass_fail_value   INTEGER,
    is_pass           INTEGER NOT NULL DEFAULT 0,
    is_fail           INTEGER NOT NULL DEFAULT 0,
    min_value         REAL,
    max_value         REAL,
    standard_value    REAL,
    CHECK (NOT (is_pass = 1 AND is_fail = 1))
);

CREATE INDEX IF NOT EXISTS idx_measurement_record
    ON inspection_measurement(record_id, parameter_id);

CREATE TABLE IF NOT EXISTS inspection_parameter (
    doc_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    fg_code           TEXT NOT NULL,
    name              TEXT NOT NULL,
    unit              TEXT NOT NULL DEFAULT '',
    kind              TEXT NOT NULL CHECK (kind IN ('number', 'leftright', 'passfail')),
    min_value         REAL NOT NULL DEFAULT 0,
    max_value         REAL NOT NULL DEFAULT 0,
    standard_value    REAL NOT NULL DEFAULT 0,
    data_type_group   TEXT,
    sort_order        INTEGER NOT NULL DEFAULT 0,
    hidden            INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_parameter_fg
    ON inspection_parameter(fg_code, sort_order);

CREATE TABLE IF NOT EXISTS action_log (
    action_id         TEXT PRIMARY KEY,
    checklist_id      INTEGER,
    inspect_code      TEXT,
    action_type       TEXT NOT NULL,
    action_ts         TEXT NOT NULL,
    actor             TEXT NOT NULL,
    payload_json      TEXT,
    detail            TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_checklist
    ON action_log(checklist_id, action_ts);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id          TEXT NOT NULL,
    key               TEXT NOT NULL,
    value             TEXT NOT NULL,
    updated_at        TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version           INTEGER PRIMARY KEY,
    applied_at        TEXT NOT NULL
);
"#;

/// 幂等建表，并写入当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 启动时检查 schema_version；只做告警，不做自动迁移
pub fn warn_if_schema_mismatch(conn: &Connection) {
    match read_schema_version(conn) {
        Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
        Ok(Some(v)) => tracing::warn!(
            found = v,
            expected = CURRENT_SCHEMA_VERSION,
            "数据库 schema_version 与当前代码不一致"
        ),
        Ok(None) => tracing::warn!("数据库缺少 schema_version 表，请先执行 init"),
        Err(e) => tracing::warn!(error = %e, "读取 schema_version 失败"),
    }
}
