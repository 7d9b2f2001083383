// ==========================================
// 质检点检表管理系统 - 点检表领域模型
// ==========================================
// 对齐: inspection_checklist 表
// 红线: inspect_code 创建后不可变
// ==========================================

use crate::domain::types::ChecklistStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Checklist - 点检表表头
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    // ===== 主键 / 编码 =====
    pub checklist_id: i64,
    pub inspect_code: String, // 检验编码 (PLANT+ZONE+YYMMDD+NNNN)

    // ===== 产品信息 =====
    pub fg_code: String,
    pub item_name: String,
    pub customer: String,
    pub customer_code: Option<String>,
    pub so_number: Option<String>,
    pub sales_order_item: Option<String>,
    pub production_order: Option<String>,
    pub size: Option<String>,
    pub type_of_film: Option<String>,

    // ===== 工厂 / 机台 =====
    pub plant: String,
    pub process: String,
    pub machine_zone: String,
    pub machine_process: Option<String>,
    pub machine_name: Option<String>,
    pub machine_storage: Option<String>,
    pub doc_data_type: Option<String>,

    // ===== 状态 =====
    pub status: ChecklistStatus,
    pub created_at: NaiveDateTime,
    pub created_by: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,

    // ===== 可变表头字段 (随点检数据一起保存) =====
    pub remark: Option<String>,
    pub inspector: Option<String>,
    pub approver: Option<String>,

    // ===== 班组检验员 =====
    pub inspector_team_a: Option<String>,
    pub inspector_team_b: Option<String>,
}

// ==========================================
// NewChecklist - 创建点检表请求
// ==========================================
// 说明: inspect_code 由 CodeAllocator 分配，调用方不可指定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChecklist {
    pub fg_code: String,
    pub item_name: String,
    pub customer: String,
    pub plant: String,
    pub process: String,
    pub machine_zone: String,
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub so_number: Option<String>,
    #[serde(default)]
    pub sales_order_item: Option<String>,
    #[serde(default)]
    pub production_order: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub type_of_film: Option<String>,
    #[serde(default)]
    pub machine_process: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    #[serde(default)]
    pub machine_storage: Option<String>,
    #[serde(default)]
    pub doc_data_type: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub inspector: Option<String>,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub inspector_team_a: Option<String>,
    #[serde(default)]
    pub inspector_team_b: Option<String>,
}

impl NewChecklist {
    /// 组装为待插入的表头（状态固定为 Active）
    pub fn into_checklist(
        self,
        inspect_code: String,
        created_at: NaiveDateTime,
        created_by: Option<String>,
    ) -> Checklist {
        Checklist {
            checklist_id: 0,
            inspect_code,
            fg_code: self.fg_code,
            item_name: self.item_name,
            customer: self.customer,
            customer_code: self.customer_code,
            so_number: self.so_number,
            sales_order_item: self.sales_order_item,
            production_order: self.production_order,
            size: self.size,
            type_of_film: self.type_of_film,
            plant: self.plant,
            process: self.process,
            machine_zone: self.machine_zone,
            machine_process: self.machine_process,
            machine_name: self.machine_name,
            machine_storage: self.machine_storage,
            doc_data_type: self.doc_data_type,
            status: ChecklistStatus::Active,
            created_at,
            created_by,
            completed_at: None,
            completed_by: None,
            remark: self.remark,
            inspector: self.inspector,
            approver: self.approver,
            inspector_team_a: self.inspector_team_a,
            inspector_team_b: self.inspector_team_b,
        }
    }
}

// ==========================================
// ChecklistSummary - 点检表列表汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistSummary {
    pub checklist_id: i64,
    pub inspect_code: String,
    pub fg_code: String,
    pub item_name: String,
    pub customer: String,
    pub status: ChecklistStatus,
    pub created_at: NaiveDateTime,
    pub created_by: Option<String>,
    pub inspector: Option<String>,
    pub approver: Option<String>,
    pub machine_zone: String,
    pub machine_name: Option<String>,

    // ===== 统计 =====
    pub total_records: i64,
    pub total_measurements: i64,
    pub passed_measurements: i64,
    pub failed_measurements: i64,
    pub pass_rate: f64, // 百分比，保留 1 位小数
}

// ==========================================
// ChecklistFilter - 列表查询条件
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistFilter {
    pub status: Option<ChecklistStatus>,
    pub fg_code: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>, // 含当天
    pub limit: Option<u32>,
}

// ==========================================
// DailyCodeStat - 当日编码统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCodeStat {
    pub plant_zone: String, // 编码前缀中的 工厂+区域
    pub count: i64,
    pub last_code: String,
}

/// 合格率（百分比，保留 1 位小数；无测量时为 0）
pub fn pass_rate_percent(passed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_rate_percent() {
        assert_eq!(pass_rate_percent(0, 0), 0.0);
        assert_eq!(pass_rate_percent(2, 3), 66.7);
        assert_eq!(pass_rate_percent(5, 5), 100.0);
    }
}
