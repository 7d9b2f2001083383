// ==========================================
// 质检点检表管理系统 - 点检表数据仓储
// ==========================================
// 对齐: inspection_checklist 表
// 红线: Repository 不含业务逻辑
// 红线: inspect_code 唯一（UNIQUE 约束兜底）
// ==========================================

use crate::db::TS_FORMAT;
use crate::domain::checklist::{
    pass_rate_percent, Checklist, ChecklistFilter, ChecklistSummary, DailyCodeStat,
};
use crate::domain::types::ChecklistStatus;
use crate::engine::code_allocator::CodeStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{get_datetime, get_enum, get_opt_datetime};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

const CHECKLIST_COLUMNS: &str = r#"
    checklist_id, inspect_code, fg_code, item_name, customer, customer_code,
    so_number, sales_order_item, production_order, size, type_of_film,
    plant, process, machine_zone, machine_process, machine_name, machine_storage,
    doc_data_type, status, created_at, created_by, completed_at, completed_by,
    remark, inspector, approver, inspector_team_a, inspector_team_b
"#;

// ==========================================
// ChecklistRepository - 点检表仓储
// ==========================================
pub struct ChecklistRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChecklistRepository {
    /// 创建新的 ChecklistRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 在同一个 IMMEDIATE 事务内分配编码并插入表头
    ///
    /// 说明：
    /// - `build` 在事务内执行（可查询当前最大编码），返回待插入的表头
    /// - `build` 返回 `Ok(None)` 表示编码冲突，事务回滚，返回 `Ok(None)`
    /// - 插入触发唯一约束时返回 `UniqueConstraintViolation`，由调用方决定是否重试
    ///
    /// # 返回
    /// - `Ok(Some(checklist))`: 插入成功，checklist_id 已回填
    pub fn insert_with_allocated_code<E, F>(&self, build: F) -> Result<Option<Checklist>, E>
    where
        E: From<RepositoryError>,
        F: FnOnce(&Connection) -> Result<Option<Checklist>, E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let mut checklist = match build(&tx)? {
            Some(c) => c,
            None => {
                tx.rollback().map_err(RepositoryError::from)?;
                return Ok(None);
            }
        };

        insert_checklist_row(&tx, &checklist)?;
        checklist.checklist_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO issued_code (inspect_code, issued_at) VALUES (?1, ?2)",
            params![checklist.inspect_code, checklist.created_at.format(TS_FORMAT).to_string()],
        )
        .map_err(RepositoryError::from)?;
        tx.commit().map_err(RepositoryError::from)?;

        Ok(Some(checklist))
    }

    /// 状态流转
    ///
    /// - Completed: 写入 completed_at / completed_by
    /// - 非法流转返回 InvalidStateTransition
    pub fn transition_status(
        &self,
        checklist_id: i64,
        target: ChecklistStatus,
        at: NaiveDateTime,
        by: Option<&str>,
    ) -> RepositoryResult<Checklist> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = find_by_id_with(&tx, checklist_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Checklist".to_string(),
            id: checklist_id.to_string(),
        })?;

        if !current.status.can_transition_to(target) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            });
        }

        let (completed_at, completed_by) = match target {
            ChecklistStatus::Completed => (Some(at.format(TS_FORMAT).to_string()), by),
            _ => (None, None),
        };

        tx.execute(
            r#"UPDATE inspection_checklist
               SET status = ?1, completed_at = ?2, completed_by = ?3
               WHERE checklist_id = ?4"#,
            params![target.as_str(), completed_at, completed_by, checklist_id],
        )?;

        let updated = find_by_id_with(&tx, checklist_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Checklist".to_string(),
            id: checklist_id.to_string(),
        })?;
        tx.commit()?;

        Ok(updated)
    }

    /// 删除点检表（级联删除记录与测量数据）
    ///
    /// 编码保留在 issued_code 中，不会再次分配
    ///
    /// # 返回
    /// - `Ok(Checklist)`: 被删除的表头
    pub fn delete(&self, checklist_id: i64) -> RepositoryResult<Checklist> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = find_by_id_with(&tx, checklist_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Checklist".to_string(),
            id: checklist_id.to_string(),
        })?;

        tx.execute(
            "DELETE FROM inspection_checklist WHERE checklist_id = ?1",
            params![checklist_id],
        )?;
        tx.commit()?;

        Ok(existing)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查询
    pub fn find_by_id(&self, checklist_id: i64) -> RepositoryResult<Option<Checklist>> {
        let conn = self.get_conn()?;
        find_by_id_with(&conn, checklist_id)
    }

    /// 按检验编码查询
    pub fn find_by_code(&self, inspect_code: &str) -> RepositoryResult<Option<Checklist>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM inspection_checklist WHERE inspect_code = ?1",
            CHECKLIST_COLUMNS
        );
        let found = conn
            .query_row(&sql, params![inspect_code], map_checklist_row)
            .optional()?;
        Ok(found)
    }

    /// 点检表列表（含记录数 / 测量数 / 合格率）
    ///
    /// 排序: 创建时间倒序
    pub fn list_summaries(&self, filter: &ChecklistFilter) -> RepositoryResult<Vec<ChecklistSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.checklist_id, c.inspect_code, c.fg_code, c.item_name, c.customer,
                   c.status, c.created_at, c.created_by, c.inspector, c.approver,
                   c.machine_zone, c.machine_name,
                   (SELECT COUNT(*) FROM inspection_record r2
                     WHERE r2.checklist_id = c.checklist_id) AS total_records,
                   COUNT(m.measurement_id) AS total_measurements,
                   COALESCE(SUM(m.is_pass), 0) AS passed,
                   COALESCE(SUM(m.is_fail), 0) AS failed
            FROM inspection_checklist c
            LEFT JOIN inspection_record r ON r.checklist_id = c.checklist_id
            LEFT JOIN inspection_measurement m ON m.record_id = r.record_id
            WHERE (?1 IS NULL OR c.status = ?1)
              AND (?2 IS NULL OR c.fg_code = ?2)
              AND (?3 IS NULL OR c.created_at >= ?3)
              AND (?4 IS NULL OR c.created_at < ?4)
            GROUP BY c.checklist_id
            ORDER BY c.created_at DESC, c.checklist_id DESC
            LIMIT ?5
            "#,
        )?;

        let from = filter
            .created_from
            .map(|d| d.format("%Y-%m-%d 00:00:00").to_string());
        // 含当天：小于次日零点
        let to = filter
            .created_to
            .and_then(|d| d.succ_opt())
            .map(|d| d.format("%Y-%m-%d 00:00:00").to_string());
        let limit: i64 = filter.limit.map(i64::from).unwrap_or(-1);

        let rows = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.fg_code.as_deref(),
                    from,
                    to,
                    limit
                ],
                |row| {
                    let total: i64 = row.get(13)?;
                    let passed: i64 = row.get(14)?;
                    Ok(ChecklistSummary {
                        checklist_id: row.get(0)?,
                        inspect_code: row.get(1)?,
                        fg_code: row.get(2)?,
                        item_name: row.get(3)?,
                        customer: row.get(4)?,
                        status: get_enum(row, 5, ChecklistStatus::from_db_str)?,
                        created_at: get_datetime(row, 6)?,
                        created_by: row.get(7)?,
                        inspector: row.get(8)?,
                        approver: row.get(9)?,
                        machine_zone: row.get(10)?,
                        machine_name: row.get(11)?,
                        total_records: row.get(12)?,
                        total_measurements: total,
                        passed_measurements: passed,
                        failed_measurements: row.get(15)?,
                        pass_rate: pass_rate_percent(passed, total),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 指定前缀的所有编码（升序）
    pub fn list_codes_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT inspect_code FROM inspection_checklist
               WHERE substr(inspect_code, 1, ?1) = ?2
               ORDER BY inspect_code"#,
        )?;
        let codes = stmt
            .query_map(params![prefix.len() as i64, prefix], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(codes)
    }

    /// 指定日期的编码统计（按 工厂+区域 分组）
    ///
    /// 编码末 10 位为 YYMMDD + 4 位序号
    pub fn daily_code_statistics(&self, date: NaiveDate) -> RepositoryResult<Vec<DailyCodeStat>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT substr(inspect_code, 1, length(inspect_code) - 10) AS plant_zone,
                   COUNT(*) AS cnt,
                   MAX(inspect_code) AS last_code
            FROM inspection_checklist
            WHERE length(inspect_code) > 10
              AND substr(inspect_code, length(inspect_code) - 9, 6) = ?1
            GROUP BY plant_zone
            ORDER BY plant_zone
            "#,
        )?;

        let stats = stmt
            .query_map(params![date.format("%y%m%d").to_string()], |row| {
                Ok(DailyCodeStat {
                    plant_zone: row.get(0)?,
                    count: row.get(1)?,
                    last_code: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stats)
    }
}

// ==========================================
// CodeStore 实现
// ==========================================
// 查询范围: issued_code（含已删除点检表的编码）

impl CodeStore for Connection {
    fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        code_len: usize,
    ) -> Result<Option<String>, RepositoryError> {
        let code = self
            .query_row(
                r#"
                SELECT inspect_code FROM issued_code
                WHERE substr(inspect_code, 1, ?1) = ?2
                  AND length(inspect_code) = ?3
                  AND substr(inspect_code, -4) GLOB '[0-9][0-9][0-9][0-9]'
                ORDER BY inspect_code DESC
                LIMIT 1
                "#,
                params![prefix.len() as i64, prefix, code_len as i64],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(code)
    }

    fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: bool = self.query_row(
            "SELECT EXISTS(SELECT 1 FROM issued_code WHERE inspect_code = ?1)",
            params![code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl CodeStore for ChecklistRepository {
    fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        code_len: usize,
    ) -> Result<Option<String>, RepositoryError> {
        self.get_conn()?.find_max_code_with_prefix(prefix, code_len)
    }

    fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        self.get_conn()?.code_exists(code)
    }
}

// ==========================================
// 行映射 / 事务内辅助
// ==========================================

pub(crate) fn find_by_id_with(conn: &Connection, checklist_id: i64) -> RepositoryResult<Option<Checklist>> {
    let sql = format!(
        "SELECT {} FROM inspection_checklist WHERE checklist_id = ?1",
        CHECKLIST_COLUMNS
    );
    let found = conn
        .query_row(&sql, params![checklist_id], map_checklist_row)
        .optional()?;
    Ok(found)
}

fn insert_checklist_row(conn: &Connection, c: &Checklist) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO inspection_checklist (
            inspect_code, fg_code, item_name, customer, customer_code,
            so_number, sales_order_item, production_order, size, type_of_film,
            plant, process, machine_zone, machine_process, machine_name, machine_storage,
            doc_data_type, status, created_at, created_by, completed_at, completed_by,
            remark, inspector, approver, inspector_team_a, inspector_team_b
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27
        )
        "#,
        params![
            c.inspect_code,
            c.fg_code,
            c.item_name,
            c.customer,
            c.customer_code,
            c.so_number,
            c.sales_order_item,
            c.production_order,
            c.size,
            c.type_of_film,
            c.plant,
            c.process,
            c.machine_zone,
            c.machine_process,
            c.machine_name,
            c.machine_storage,
            c.doc_data_type,
            c.status.as_str(),
            c.created_at.format(TS_FORMAT).to_string(),
            c.created_by,
            c.completed_at.map(|t| t.format(TS_FORMAT).to_string()),
            c.completed_by,
            c.remark,
            c.inspector,
            c.approver,
            c.inspector_team_a,
            c.inspector_team_b,
        ],
    )?;
    Ok(())
}

fn map_checklist_row(row: &Row) -> rusqlite::Result<Checklist> {
    Ok(Checklist {
        checklist_id: row.get(0)?,
        inspect_code: row.get(1)?,
        fg_code: row.get(2)?,
        item_name: row.get(3)?,
        customer: row.get(4)?,
        customer_code: row.get(5)?,
        so_number: row.get(6)?,
        sales_order_item: row.get(7)?,
        production_order: row.get(8)?,
        size: row.get(9)?,
        type_of_film: row.get(10)?,
        plant: row.get(11)?,
        process: row.get(12)?,
        machine_zone: row.get(13)?,
        machine_process: row.get(14)?,
        machine_name: row.get(15)?,
        machine_storage: row.get(16)?,
        doc_data_type: row.get(17)?,
        status: get_enum(row, 18, ChecklistStatus::from_db_str)?,
        created_at: get_datetime(row, 19)?,
        created_by: row.get(20)?,
        completed_at: get_opt_datetime(row, 21)?,
        completed_by: row.get(22)?,
        remark: row.get(23)?,
        inspector: row.get(24)?,
        approver: row.get(25)?,
        inspector_team_a: row.get(26)?,
        inspector_team_b: row.get(27)?,
    })
}
