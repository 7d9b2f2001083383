// ==========================================
// 质检点检表管理系统 - 点检表 API
// ==========================================
// 职责: 点检表创建（编码分配）、点检数据整批保存、状态流转、查询
// 红线: 校验与判定在事务外完成，校验失败不写任何数据
// 红线: 保存为整批替换，后写覆盖先写（不做乐观锁）
// ==========================================

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::checklist::{Checklist, ChecklistFilter, ChecklistSummary, DailyCodeStat, NewChecklist};
use crate::domain::inspection::{
    HeaderUpdate, InspectionBatch, InspectionRecord, PreparedMeasurement, PreparedRecord,
    SaveInspectionRequest, SaveOutcome,
};
use crate::domain::types::{ChecklistStatus, MeasurementKind, Shift};
use crate::engine::classifier::{ClassifyInput, MeasurementClassifier, MeasurementSpec};
use crate::engine::code_allocator::{build_prefix, AllocationError, CodeAllocator};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::checklist_repo::ChecklistRepository;
use crate::repository::inspection_repo::InspectionRepository;

// ==========================================
// ChecklistApi - 点检表 API
// ==========================================

/// 点检表API
///
/// 职责：
/// 1. 创建点检表（分配检验编码 + 插入表头在同一事务内）
/// 2. 点检数据整批保存（校验 → 判定 → 原子替换）
/// 3. 完成 / 取消 / 删除
/// 4. ActionLog记录
pub struct ChecklistApi {
    checklist_repo: Arc<ChecklistRepository>,
    inspection_repo: Arc<InspectionRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    allocator: Arc<CodeAllocator>,
    classifier: MeasurementClassifier,
}

impl ChecklistApi {
    /// 创建新的ChecklistApi实例
    ///
    /// # 参数
    /// - checklist_repo: 点检表仓储
    /// - inspection_repo: 点检数据仓储
    /// - action_log_repo: 操作日志仓储
    /// - allocator: 检验编码分配器
    pub fn new(
        checklist_repo: Arc<ChecklistRepository>,
        inspection_repo: Arc<InspectionRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        allocator: Arc<CodeAllocator>,
    ) -> Self {
        Self {
            checklist_repo,
            inspection_repo,
            action_log_repo,
            allocator,
            classifier: MeasurementClassifier::new(),
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建点检表（当前时间）
    pub fn create_checklist(&self, request: NewChecklist, actor: &str) -> ApiResult<Checklist> {
        self.create_checklist_at(request, actor, now())
    }

    /// 创建点检表
    ///
    /// 编码日期取 `now` 的日期部分
    ///
    /// # 返回
    /// - Ok(Checklist): 已落库的表头（含编码与ID）
    /// - Err(ApiError::AllocationExhausted): 重试耗尽或当日序号用尽
    /// - Err(ApiError::InvalidInput): 必填字段缺失或工厂/区域格式非法
    #[instrument(skip(self, request), fields(fg_code = %request.fg_code, plant = %request.plant, zone = %request.machine_zone))]
    pub fn create_checklist_at(
        &self,
        request: NewChecklist,
        actor: &str,
        now: NaiveDateTime,
    ) -> ApiResult<Checklist> {
        let request = normalize_new_checklist(request)?;
        let created_by = non_empty(actor);

        let created = self.allocator.allocate_with(
            &request.plant,
            &request.machine_zone,
            now.date(),
            |prefix| {
                self.checklist_repo
                    .insert_with_allocated_code::<AllocationError, _>(|conn| {
                        let code = self.allocator.propose(conn, prefix)?;
                        Ok(code.map(|code| request.clone().into_checklist(code, now, created_by.clone())))
                    })
            },
        )?;

        info!(
            checklist_id = created.checklist_id,
            inspect_code = %created.inspect_code,
            "点检表已创建"
        );

        let log = ActionLog::new(ActionType::CreateChecklist, actor, now)
            .with_checklist(created.checklist_id, &created.inspect_code)
            .with_payload(&request);
        self.record_action(&log);

        Ok(created)
    }

    // ==========================================
    // 点检数据保存
    // ==========================================

    /// 整批保存点检数据（当前时间）
    pub fn save_inspection_batch(
        &self,
        request: &SaveInspectionRequest,
        actor: &str,
    ) -> ApiResult<SaveOutcome> {
        self.save_inspection_batch_at(request, actor, now())
    }

    /// 整批保存点检数据
    ///
    /// 流程:
    /// 1. 校验行（班次 / 时间）与测量（参数标识 / 行号）
    /// 2. 逐条判定合格 / 不合格
    /// 3. 单事务内替换全部记录并写审计
    ///
    /// # 返回
    /// - Err(ApiError::ValidationError): 任一行或测量校验失败，未写入任何数据
    /// - Err(ApiError::NotFound): 点检表不存在
    #[instrument(skip(self, request), fields(
        checklist_id = request.checklist_id,
        rows = request.rows.len(),
        measurements = request.measurements.len()
    ))]
    pub fn save_inspection_batch_at(
        &self,
        request: &SaveInspectionRequest,
        actor: &str,
        now: NaiveDateTime,
    ) -> ApiResult<SaveOutcome> {
        let batch = self.prepare_batch(request, actor, now)?;

        let log = ActionLog::new(ActionType::SaveInspection, actor, now)
            .with_payload(&json!({
                "records": batch.records.len(),
                "measurements": batch.measurement_count(),
                "remark": batch.header.remark,
                "inspector": batch.header.inspector,
                "approver": batch.header.approver,
            }));

        let outcome = self.inspection_repo.replace_batch(&batch, log)?;

        info!(
            inspect_code = %outcome.inspect_code,
            records = outcome.records_written,
            measurements = outcome.measurements_written,
            failed = outcome.failed_measurements,
            "点检数据已保存"
        );
        Ok(outcome)
    }

    /// 校验并判定，组装待写入批次
    fn prepare_batch(
        &self,
        request: &SaveInspectionRequest,
        actor: &str,
        now: NaiveDateTime,
    ) -> ApiResult<InspectionBatch> {
        let mut records = request
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| -> ApiResult<PreparedRecord> {
                let shift = row.shift.parse::<Shift>().map_err(|e| {
                    ApiError::ValidationError(format!("第{}行: {}", i + 1, e))
                })?;
                let inspection_time = parse_inspection_time(&row.time).ok_or_else(|| {
                    ApiError::ValidationError(format!(
                        "第{}行: 时间格式无效 '{}'（应为 HH:MM 或 HH:MM:SS）",
                        i + 1,
                        row.time
                    ))
                })?;
                Ok(PreparedRecord {
                    shift,
                    inspection_time,
                    note: row.note.as_deref().and_then(non_empty),
                    measurements: Vec::new(),
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        for (i, m) in request.measurements.iter().enumerate() {
            let parameter_id = m.parameter_id.trim();
            if parameter_id.is_empty() {
                return Err(ApiError::ValidationError(format!(
                    "第{}条测量: 参数标识不能为空",
                    i + 1
                )));
            }
            let row_count = records.len();
            let record = records.get_mut(m.row_index).ok_or_else(|| {
                ApiError::ValidationError(format!(
                    "第{}条测量: rowIndex={} 超出行数 {}",
                    i + 1,
                    m.row_index,
                    row_count
                ))
            })?;

            let verdict = self
                .classifier
                .classify(ClassifyInput {
                    kind: m.kind,
                    raw_value: m.value.as_deref(),
                    spec: MeasurementSpec {
                        min: m.min,
                        max: m.max,
                        standard: m.standard,
                    },
                    submitted_pass: m.is_pass,
                    submitted_fail: m.is_fail,
                })
                .map_err(|e| {
                    ApiError::ValidationError(format!("第{}条测量 ({}): {}", i + 1, parameter_id, e))
                })?;

            // 规格快照只对数值类保存
            let spec = match m.kind {
                MeasurementKind::Number => verdict.spec,
                _ => MeasurementSpec::default(),
            };

            record.measurements.push(PreparedMeasurement {
                parameter_id: parameter_id.to_string(),
                parameter_name: m.parameter_name.clone(),
                kind: m.kind,
                value: verdict.stored_value,
                numeric_value: verdict.numeric_value,
                unit: m.unit.clone(),
                pass_fail_value: verdict.pass_fail_value,
                is_pass: verdict.is_pass,
                is_fail: verdict.is_fail,
                min_value: spec.min,
                max_value: spec.max,
                standard_value: spec.standard,
            });
        }

        Ok(InspectionBatch {
            checklist_id: request.checklist_id,
            header: HeaderUpdate {
                remark: request.remark.clone(),
                inspector: request.inspector.clone(),
                approver: request.approver.clone(),
            },
            records,
            saved_at: now,
            saved_by: non_empty(actor),
        })
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 完成点检表 (Active → Completed)
    pub fn complete_checklist(&self, checklist_id: i64, actor: &str) -> ApiResult<Checklist> {
        self.transition(checklist_id, ChecklistStatus::Completed, ActionType::CompleteChecklist, actor)
    }

    /// 取消点检表 (Active → Cancelled)
    pub fn cancel_checklist(&self, checklist_id: i64, actor: &str) -> ApiResult<Checklist> {
        self.transition(checklist_id, ChecklistStatus::Cancelled, ActionType::CancelChecklist, actor)
    }

    fn transition(
        &self,
        checklist_id: i64,
        target: ChecklistStatus,
        action: ActionType,
        actor: &str,
    ) -> ApiResult<Checklist> {
        let at = now();
        let updated = self.checklist_repo.transition_status(
            checklist_id,
            target,
            at,
            non_empty(actor).as_deref(),
        )?;

        info!(inspect_code = %updated.inspect_code, status = %updated.status, "点检表状态已变更");

        let log = ActionLog::new(action, actor, at)
            .with_checklist(updated.checklist_id, &updated.inspect_code)
            .with_detail(format!("status -> {}", target));
        self.record_action(&log);

        Ok(updated)
    }

    /// 删除点检表（级联删除记录与测量）
    ///
    /// 任意状态均可删除；操作日志保留
    pub fn delete_checklist(&self, checklist_id: i64, actor: &str) -> ApiResult<Checklist> {
        let deleted = self.checklist_repo.delete(checklist_id)?;
        warn!(inspect_code = %deleted.inspect_code, actor = actor, "点检表已删除");

        let log = ActionLog::new(ActionType::DeleteChecklist, actor, now())
            .with_checklist(deleted.checklist_id, &deleted.inspect_code)
            .with_payload(&json!({ "fg_code": deleted.fg_code, "status": deleted.status }));
        self.record_action(&log);

        Ok(deleted)
    }

    // ==========================================
    // 查询接口
    // ==========================================

    pub fn get_checklist(&self, checklist_id: i64) -> ApiResult<Checklist> {
        self.checklist_repo
            .find_by_id(checklist_id)?
            .ok_or_else(|| ApiError::NotFound(format!("点检表(id={})不存在", checklist_id)))
    }

    pub fn get_checklist_by_code(&self, inspect_code: &str) -> ApiResult<Checklist> {
        self.checklist_repo
            .find_by_code(inspect_code.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("点检表(code={})不存在", inspect_code)))
    }

    pub fn list_checklists(&self, filter: &ChecklistFilter) -> ApiResult<Vec<ChecklistSummary>> {
        Ok(self.checklist_repo.list_summaries(filter)?)
    }

    /// 点检记录（含测量），点检表不存在时返回 NotFound
    pub fn get_records(&self, checklist_id: i64) -> ApiResult<Vec<InspectionRecord>> {
        let snapshot = self
            .inspection_repo
            .load_snapshot(checklist_id)?
            .ok_or_else(|| ApiError::NotFound(format!("点检表(id={})不存在", checklist_id)))?;
        Ok(snapshot.records)
    }

    /// 操作日志（新到旧）
    pub fn get_action_logs(&self, checklist_id: i64) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_checklist(checklist_id)?)
    }

    // ==========================================
    // 编码查询
    // ==========================================

    /// 预览下一个编码（不占用）
    pub fn preview_code(&self, plant: &str, zone: &str, date: NaiveDate) -> ApiResult<String> {
        Ok(self
            .allocator
            .allocate(self.checklist_repo.as_ref(), plant.trim(), zone.trim(), date)?)
    }

    /// 指定 (工厂, 区域, 日期) 下已分配的编码
    pub fn list_codes(&self, plant: &str, zone: &str, date: NaiveDate) -> ApiResult<Vec<String>> {
        let prefix = build_prefix(plant.trim(), zone.trim(), date)?;
        Ok(self.checklist_repo.list_codes_with_prefix(&prefix)?)
    }

    /// 指定日期按 工厂+区域 的编码统计
    pub fn daily_code_statistics(&self, date: NaiveDate) -> ApiResult<Vec<DailyCodeStat>> {
        Ok(self.checklist_repo.daily_code_statistics(date)?)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn record_action(&self, log: &ActionLog) {
        // 审计失败只记录警告，主操作已提交
        if let Err(e) = self.action_log_repo.insert(log) {
            warn!(error = %e, action = %log.action_type, "记录操作日志失败");
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// 解析点检时间: HH:MM 或 HH:MM:SS
pub fn parse_inspection_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// 必填字段校验并去除首尾空白
fn normalize_new_checklist(mut request: NewChecklist) -> ApiResult<NewChecklist> {
    let required: [(&str, &mut String); 6] = [
        ("fgCode", &mut request.fg_code),
        ("itemName", &mut request.item_name),
        ("customer", &mut request.customer),
        ("plant", &mut request.plant),
        ("process", &mut request.process),
        ("machineZone", &mut request.machine_zone),
    ];
    for (field, value) in required {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidInput(format!("{} 不能为空", field)));
        }
        *value = trimmed.to_string();
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspection_time() {
        assert_eq!(parse_inspection_time("08:30"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_inspection_time(" 23:59:59 "), NaiveTime::from_hms_opt(23, 59, 59));
        assert_eq!(parse_inspection_time("24:00"), None);
        assert_eq!(parse_inspection_time("8.30"), None);
        assert_eq!(parse_inspection_time(""), None);
    }

    #[test]
    fn test_normalize_new_checklist() {
        let request = NewChecklist {
            fg_code: " FG001 ".to_string(),
            item_name: "Film".to_string(),
            customer: "ACME".to_string(),
            plant: "KB".to_string(),
            process: "BLOW".to_string(),
            machine_zone: " A".to_string(),
            ..Default::default()
        };
        let normalized = normalize_new_checklist(request).unwrap();
        assert_eq!(normalized.fg_code, "FG001");
        assert_eq!(normalized.machine_zone, "A");

        let missing = NewChecklist {
            fg_code: "FG001".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            normalize_new_checklist(missing),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
