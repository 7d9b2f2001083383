// ==========================================
// 质检点检表管理系统 - 检验参数目录
// ==========================================
// 对齐: inspection_parameter 表（外部主数据，只读）
// 红线: 数值类参数满足 min < standard < max
// ==========================================

use crate::domain::types::MeasurementKind;
use serde::{Deserialize, Serialize};

/// 报表匹配测量数据用的参数标识前缀
pub const PARAMETER_KEY_PREFIX: &str = "param_";

/// 目录中的一个检验参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogParameter {
    pub id: i64,
    pub fg_code: String,
    pub name: String,
    pub unit: String,
    pub kind: MeasurementKind,
    pub min: f64,
    pub max: f64,
    pub standard: f64,
    pub data_type_group: Option<String>,
    pub sort_order: i32,
    pub hidden: bool,
}

impl CatalogParameter {
    /// 合成参数标识: "param_" + 目录行ID
    ///
    /// 测量数据的 parameter_id 按此标识匹配
    pub fn parameter_key(&self) -> String {
        format!("{}{}", PARAMETER_KEY_PREFIX, self.id)
    }

    /// 是否带有上下限标注（任一边界非零）
    pub fn has_range(&self) -> bool {
        self.min != 0.0 || self.max != 0.0
    }

    /// 数值类参数规格是否自洽
    pub fn is_spec_consistent(&self) -> bool {
        match self.kind {
            MeasurementKind::Number => self.min < self.standard && self.standard < self.max,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(kind: MeasurementKind, min: f64, std: f64, max: f64) -> CatalogParameter {
        CatalogParameter {
            id: 42,
            fg_code: "FG001".to_string(),
            name: "Film Thickness".to_string(),
            unit: "micron".to_string(),
            kind,
            min,
            max,
            standard: std,
            data_type_group: Some("เป่า".to_string()),
            sort_order: 1,
            hidden: false,
        }
    }

    #[test]
    fn test_parameter_key() {
        assert_eq!(param(MeasurementKind::Number, 1.0, 2.0, 3.0).parameter_key(), "param_42");
    }

    #[test]
    fn test_has_range_any_nonzero_bound() {
        assert!(param(MeasurementKind::Number, 0.0, 1.0, 3.0).has_range());
        assert!(!param(MeasurementKind::PassFail, 0.0, 0.0, 0.0).has_range());
    }

    #[test]
    fn test_spec_consistency() {
        assert!(param(MeasurementKind::Number, 38.1, 44.45, 50.8).is_spec_consistent());
        assert!(!param(MeasurementKind::Number, 5.0, 4.0, 6.0).is_spec_consistent());
        assert!(param(MeasurementKind::PassFail, 0.0, 0.0, 0.0).is_spec_consistent());
    }
}
