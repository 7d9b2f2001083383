// ==========================================
// 质检点检表管理系统 - 点检记录 / 测量数据领域模型
// ==========================================
// 对齐: inspection_record / inspection_measurement 表
// 红线: 记录集随每次保存整体替换，没有独立生命周期
// 红线: is_pass 与 is_fail 互斥
// ==========================================

use crate::domain::types::{MeasurementKind, Shift};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// 读模型
// ==========================================

/// 点检记录（一个班次/时间点的一次检验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub record_id: i64,
    pub checklist_id: i64,
    pub shift: Shift,
    pub inspection_time: NaiveTime,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<String>,
    pub measurements: Vec<Measurement>,
}

impl InspectionRecord {
    /// 报表显示用时间 (HH:MM)
    pub fn time_label(&self) -> String {
        self.inspection_time.format("%H:%M").to_string()
    }

    /// 按参数标识查找测量（取第一条匹配）
    pub fn find_measurement(&self, parameter_id: &str) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.parameter_id == parameter_id)
    }
}

/// 测量数据
///
/// min/max/standard 为测量时的规格快照，之后规格变更不影响历史数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub measurement_id: i64,
    pub record_id: i64,
    pub parameter_id: String,
    pub parameter_name: String,
    pub kind: MeasurementKind,
    pub value: Option<String>,
    pub numeric_value: Option<f64>,
    pub unit: Option<String>,
    pub is_pass: bool,
    pub is_fail: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub standard_value: Option<f64>,
}

// ==========================================
// 保存请求 (客户端提交)
// ==========================================

/// 批量保存请求
///
/// 字段名与前端 JSON (camelCase) 对齐
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInspectionRequest {
    pub checklist_id: i64,
    #[serde(default)]
    pub rows: Vec<InspectionRowInput>,
    #[serde(default)]
    pub measurements: Vec<MeasurementInput>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub inspector: Option<String>,
    #[serde(default)]
    pub approver: Option<String>,
}

/// 一行点检记录（未校验）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRowInput {
    pub shift: String,
    pub time: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// 一条测量输入（未判定）
///
/// row_index 按位置关联到 rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementInput {
    pub parameter_id: String,
    pub parameter_name: String,
    pub row_index: usize,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub kind: MeasurementKind,
    #[serde(default)]
    pub is_pass: bool,
    #[serde(default)]
    pub is_fail: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub standard: Option<f64>,
}

// ==========================================
// 写模型 (已校验 + 已判定，直接落库)
// ==========================================

/// 表头可变字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderUpdate {
    pub remark: Option<String>,
    pub inspector: Option<String>,
    pub approver: Option<String>,
}

/// 待写入的点检记录
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub shift: Shift,
    pub inspection_time: NaiveTime,
    pub note: Option<String>,
    pub measurements: Vec<PreparedMeasurement>,
}

/// 待写入的测量数据
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMeasurement {
    pub parameter_id: String,
    pub parameter_name: String,
    pub kind: MeasurementKind,
    pub value: Option<String>,
    pub numeric_value: Option<f64>,
    pub unit: Option<String>,
    pub pass_fail_value: Option<bool>,
    pub is_pass: bool,
    pub is_fail: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub standard_value: Option<f64>,
}

/// 一次保存的完整批次
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionBatch {
    pub checklist_id: i64,
    pub header: HeaderUpdate,
    pub records: Vec<PreparedRecord>,
    pub saved_at: NaiveDateTime,
    pub saved_by: Option<String>,
}

impl InspectionBatch {
    pub fn measurement_count(&self) -> usize {
        self.records.iter().map(|r| r.measurements.len()).sum()
    }
}

/// 保存结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub checklist_id: i64,
    pub inspect_code: String,
    pub records_written: usize,
    pub measurements_written: usize,
    pub failed_measurements: usize,
}
