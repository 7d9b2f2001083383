// ==========================================
// 质检点检表管理系统 - 点检数据仓储
// ==========================================
// 对齐: inspection_record / inspection_measurement 表
// 红线: 一次保存 = 一个事务（表头更新 + 删旧 + 写新 + 审计）
// 红线: 任一步失败整体回滚，不留部分数据
// ==========================================

use crate::db::{TIME_FORMAT, TS_FORMAT};
use crate::domain::action_log::ActionLog;
use crate::domain::checklist::Checklist;
use crate::domain::inspection::{InspectionBatch, InspectionRecord, Measurement, SaveOutcome};
use crate::domain::types::{MeasurementKind, Shift};
use crate::repository::action_log_repo::insert_action_log;
use crate::repository::checklist_repo::find_by_id_with;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{get_datetime, get_enum, get_time};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 一致性读取结果（表头 + 记录 + 测量）
#[derive(Debug, Clone)]
pub struct InspectionSnapshot {
    pub checklist: Checklist,
    pub records: Vec<InspectionRecord>,
}

// ==========================================
// InspectionRepository - 点检数据仓储
// ==========================================
pub struct InspectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InspectionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 整批替换点检数据
    ///
    /// 事务内顺序:
    /// 1. 确认点检表存在
    /// 2. 更新 remark / inspector / approver
    /// 3. 删除该点检表的全部记录与测量
    /// 4. 逐行写入记录及其测量
    /// 5. 写审计日志
    ///
    /// # 参数
    /// - batch: 已校验、已判定的批次
    /// - audit: 审计日志（点检表信息由本方法补齐）
    pub fn replace_batch(&self, batch: &InspectionBatch, audit: ActionLog) -> RepositoryResult<SaveOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inspect_code: String = tx
            .query_row(
                "SELECT inspect_code FROM inspection_checklist WHERE checklist_id = ?1",
                params![batch.checklist_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Checklist".to_string(),
                id: batch.checklist_id.to_string(),
            })?;

        tx.execute(
            r#"UPDATE inspection_checklist
               SET remark = ?1, inspector = ?2, approver = ?3
               WHERE checklist_id = ?4"#,
            params![
                batch.header.remark,
                batch.header.inspector,
                batch.header.approver,
                batch.checklist_id
            ],
        )?;

        tx.execute(
            r#"DELETE FROM inspection_measurement
               WHERE record_id IN (SELECT record_id FROM inspection_record WHERE checklist_id = ?1)"#,
            params![batch.checklist_id],
        )?;
        let removed = tx.execute(
            "DELETE FROM inspection_record WHERE checklist_id = ?1",
            params![batch.checklist_id],
        )?;

        let saved_at = batch.saved_at.format(TS_FORMAT).to_string();
        let mut measurements_written = 0;
        let mut failed_measurements = 0;
        {
            let mut insert_record = tx.prepare_cached(
                r#"INSERT INTO inspection_record (
                       checklist_id, shift, inspection_time, note, created_at, created_by
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;
            let mut insert_measurement = tx.prepare_cached(
                r#"INSERT INTO inspection_measurement (
                       record_id, parameter_id, parameter_name, kind, value, numeric_value,
                       unit, pass_fail_value, is_pass, is_fail, min_value, max_value, standard_value
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            )?;

            for record in &batch.records {
                let record_id = insert_record.insert(params![
                    batch.checklist_id,
                    record.shift.as_str(),
                    record.inspection_time.format(TIME_FORMAT).to_string(),
                    record.note,
                    saved_at,
                    batch.saved_by,
                ])?;

                for m in &record.measurements {
                    insert_measurement.execute(params![
                        record_id,
                        m.parameter_id,
                        m.parameter_name,
                        m.kind.as_str(),
                        m.value,
                        m.numeric_value,
                        m.unit,
                        m.pass_fail_value,
                        m.is_pass,
                        m.is_fail,
                        m.min_value,
                        m.max_value,
                        m.standard_value,
                    ])?;
                    measurements_written += 1;
                    if m.is_fail {
                        failed_measurements += 1;
                    }
                }
            }
        }

        let audit = audit.with_checklist(batch.checklist_id, &inspect_code);
        insert_action_log(&tx, &audit)?;

        tx.commit()?;

        tracing::debug!(
            checklist_id = batch.checklist_id,
            removed_records = removed,
            records = batch.records.len(),
            measurements = measurements_written,
            "点检数据整批替换完成"
        );

        Ok(SaveOutcome {
            checklist_id: batch.checklist_id,
            inspect_code,
            records_written: batch.records.len(),
            measurements_written,
            failed_measurements,
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 读取点检记录（含测量数据）
    ///
    /// 排序: 记录按 (created_at, record_id)，测量按 parameter_id
    pub fn load_records(&self, checklist_id: i64) -> RepositoryResult<Vec<InspectionRecord>> {
        let conn = self.get_conn()?;
        load_records_with(&conn, checklist_id)
    }

    /// 在一个读事务内读取表头与全部记录
    ///
    /// 与并发保存互不交错：要么看到保存前，要么看到保存后
    pub fn load_snapshot(&self, checklist_id: i64) -> RepositoryResult<Option<InspectionSnapshot>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let checklist = match find_by_id_with(&tx, checklist_id)? {
            Some(c) => c,
            None => return Ok(None),
        };
        let records = load_records_with(&tx, checklist_id)?;
        tx.commit()?;

        Ok(Some(InspectionSnapshot { checklist, records }))
    }
}

fn load_records_with(conn: &Connection, checklist_id: i64) -> RepositoryResult<Vec<InspectionRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT record_id, checklist_id, shift, inspection_time, note, created_at, created_by
        FROM inspection_record
        WHERE checklist_id = ?1
        ORDER BY created_at, record_id
        "#,
    )?;
    let mut records = stmt
        .query_map(params![checklist_id], |row| {
            Ok(InspectionRecord {
                record_id: row.get(0)?,
                checklist_id: row.get(1)?,
                shift: get_enum(row, 2, |s| s.parse::<Shift>().ok())?,
                inspection_time: get_time(row, 3)?,
                note: row.get(4)?,
                created_at: get_datetime(row, 5)?,
                created_by: row.get(6)?,
                measurements: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if records.is_empty() {
        return Ok(records);
    }

    let mut stmt = conn.prepare(
        r#"
        SELECT m.measurement_id, m.record_id, m.parameter_id, m.parameter_name, m.kind,
               m.value, m.numeric_value, m.unit, m.is_pass, m.is_fail,
               m.min_value, m.max_value, m.standard_value
        FROM inspection_measurement m
        JOIN inspection_record r ON r.record_id = m.record_id
        WHERE r.checklist_id = ?1
        ORDER BY m.record_id, m.parameter_id, m.measurement_id
        "#,
    )?;
    let measurements = stmt
        .query_map(params![checklist_id], |row| {
            Ok(Measurement {
                measurement_id: row.get(0)?,
                record_id: row.get(1)?,
                parameter_id: row.get(2)?,
                parameter_name: row.get(3)?,
                kind: get_enum(row, 4, |s| s.parse::<MeasurementKind>().ok())?,
                value: row.get(5)?,
                numeric_value: row.get(6)?,
                unit: row.get(7)?,
                is_pass: row.get(8)?,
                is_fail: row.get(9)?,
                min_value: row.get(10)?,
                max_value: row.get(11)?,
                standard_value: row.get(12)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let index: HashMap<i64, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.record_id, i))
        .collect();
    for m in measurements {
        if let Some(&i) = index.get(&m.record_id) {
            records[i].measurements.push(m);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests;
