// ==========================================
// 质检点检表管理系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,          // 日志ID (uuid)
    pub checklist_id: Option<i64>,  // 关联点检表 (删除后保留日志，可为None)
    pub inspect_code: Option<String>,
    pub action_type: String,        // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateChecklist,   // 创建点检表（分配编码）
    SaveInspection,    // 保存点检数据
    CompleteChecklist, // 完成点检表
    CancelChecklist,   // 取消点检表
    DeleteChecklist,   // 删除点检表
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateChecklist => "CreateChecklist",
            ActionType::SaveInspection => "SaveInspection",
            ActionType::CompleteChecklist => "CompleteChecklist",
            ActionType::CancelChecklist => "CancelChecklist",
            ActionType::DeleteChecklist => "DeleteChecklist",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionLog {
    /// 创建新的操作日志（action_id 自动生成）
    pub fn new(action_type: ActionType, actor: &str, action_ts: NaiveDateTime) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            checklist_id: None,
            inspect_code: None,
            action_type: action_type.as_str().to_string(),
            action_ts,
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 关联点检表
    pub fn with_checklist(mut self, checklist_id: i64, inspect_code: &str) -> Self {
        self.checklist_id = Some(checklist_id);
        self.inspect_code = Some(inspect_code.to_string());
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
