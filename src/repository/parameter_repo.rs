// ==========================================
// 质检点检表管理系统 - 检验参数目录仓储
// ==========================================
// 对齐: inspection_parameter 表
// 说明: 参数目录为外部主数据，核心流程只读
// ==========================================

use crate::domain::parameter::CatalogParameter;
use crate::domain::types::MeasurementKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::get_enum;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ParameterCatalog - 参数目录查询接口
// ==========================================
pub trait ParameterCatalog: Send + Sync {
    /// 查询指定 FG 的可见参数，按 sort_order 排序
    fn parameters_for(&self, fg_code: &str) -> RepositoryResult<Vec<CatalogParameter>>;
}

pub struct ParameterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ParameterRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一条参数（主数据同步 / 测试准备用）
    ///
    /// # 返回
    /// - 新参数的目录ID
    pub fn insert(&self, p: &CatalogParameter) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO inspection_parameter (
                fg_code, name, unit, kind, min_value, max_value, standard_value,
                data_type_group, sort_order, hidden
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                p.fg_code,
                p.name,
                p.unit,
                p.kind.as_str(),
                p.min,
                p.max,
                p.standard,
                p.data_type_group,
                p.sort_order,
                p.hidden,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl ParameterCatalog for ParameterRepository {
    fn parameters_for(&self, fg_code: &str) -> RepositoryResult<Vec<CatalogParameter>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT doc_id, fg_code, name, unit, kind, min_value, max_value, standard_value,
                   data_type_group, sort_order, hidden
            FROM inspection_parameter
            WHERE fg_code = ?1 AND hidden = 0
            ORDER BY sort_order, doc_id
            "#,
        )?;

        let params = stmt
            .query_map(params![fg_code], |row| {
                Ok(CatalogParameter {
                    id: row.get(0)?,
                    fg_code: row.get(1)?,
                    name: row.get(2)?,
                    unit: row.get(3)?,
                    kind: get_enum(row, 4, |s| s.parse::<MeasurementKind>().ok())?,
                    min: row.get(5)?,
                    max: row.get(6)?,
                    standard: row.get(7)?,
                    data_type_group: row.get(8)?,
                    sort_order: row.get(9)?,
                    hidden: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(params)
    }
}
