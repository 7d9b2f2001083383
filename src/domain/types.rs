// ==========================================
// 质检点检表管理系统 - 领域类型定义
// ==========================================
// 依据: inspection_checklist / inspection_record / inspection_measurement 表
// 红线: 枚举值与数据库存储字符串一一对应
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 点检表状态 (Checklist Status)
// ==========================================
// 状态流转: Active → Completed / Active → Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecklistStatus {
    Active,    // 进行中
    Completed, // 已完成
    Cancelled, // 已取消
}

impl ChecklistStatus {
    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistStatus::Active => "Active",
            ChecklistStatus::Completed => "Completed",
            ChecklistStatus::Cancelled => "Cancelled",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(ChecklistStatus::Active),
            "Completed" => Some(ChecklistStatus::Completed),
            "Cancelled" => Some(ChecklistStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否允许流转到目标状态
    pub fn can_transition_to(&self, target: ChecklistStatus) -> bool {
        matches!(
            (self, target),
            (ChecklistStatus::Active, ChecklistStatus::Completed)
                | (ChecklistStatus::Active, ChecklistStatus::Cancelled)
        )
    }
}

impl fmt::Display for ChecklistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 测量类型 (Measurement Kind)
// ==========================================
// 存储字符串: number / leftright / passfail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    #[serde(rename = "number", alias = "numeric")]
    Number, // 数值测量，按 min/max 判定
    #[serde(rename = "leftright", alias = "left-right")]
    LeftRight, // 左/右记录，不做判定
    #[serde(rename = "passfail", alias = "pass-fail")]
    PassFail, // 人工合格/不合格
}

impl MeasurementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Number => "number",
            MeasurementKind::LeftRight => "leftright",
            MeasurementKind::PassFail => "passfail",
        }
    }
}

impl FromStr for MeasurementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "number" | "numeric" => Ok(MeasurementKind::Number),
            "leftright" | "left-right" => Ok(MeasurementKind::LeftRight),
            "passfail" | "pass-fail" => Ok(MeasurementKind::PassFail),
            other => Err(format!("未知的测量类型: {}", other)),
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 班次 (Shift)
// ==========================================
// 固定三班: A / B / C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    A,
    B,
    C,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::A => "A",
            Shift::B => "B",
            Shift::C => "C",
        }
    }
}

impl FromStr for Shift {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Shift::A),
            "B" => Ok(Shift::B),
            "C" => Ok(Shift::C),
            other => Err(format!("未知的班次: '{}'（允许值: A/B/C）", other)),
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 单元格判定提示 (Cell Hint)
// ==========================================
// 仅用于报表着色，不参与业务判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellHint {
    Pass,
    Fail,
    Neutral,
}

impl CellHint {
    /// 由测量标志推导提示；不合格优先
    pub fn from_flags(is_pass: bool, is_fail: bool) -> Self {
        if is_fail {
            CellHint::Fail
        } else if is_pass {
            CellHint::Pass
        } else {
            CellHint::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(ChecklistStatus::Active.can_transition_to(ChecklistStatus::Completed));
        assert!(ChecklistStatus::Active.can_transition_to(ChecklistStatus::Cancelled));
        assert!(!ChecklistStatus::Completed.can_transition_to(ChecklistStatus::Active));
        assert!(!ChecklistStatus::Cancelled.can_transition_to(ChecklistStatus::Completed));
    }

    #[test]
    fn test_measurement_kind_parse_and_serde() {
        assert_eq!("number".parse::<MeasurementKind>(), Ok(MeasurementKind::Number));
        assert_eq!("left-right".parse::<MeasurementKind>(), Ok(MeasurementKind::LeftRight));
        assert!("color".parse::<MeasurementKind>().is_err());

        let kind: MeasurementKind = serde_json::from_str("\"passfail\"").unwrap();
        assert_eq!(kind, MeasurementKind::PassFail);
        assert_eq!(serde_json::to_string(&MeasurementKind::LeftRight).unwrap(), "\"leftright\"");
    }

    #[test]
    fn test_shift_parse() {
        assert_eq!(" b ".parse::<Shift>(), Ok(Shift::B));
        assert!("D".parse::<Shift>().is_err());
    }

    #[test]
    fn test_cell_hint_fail_wins() {
        assert_eq!(CellHint::from_flags(true, false), CellHint::Pass);
        assert_eq!(CellHint::from_flags(false, true), CellHint::Fail);
        assert_eq!(CellHint::from_flags(false, false), CellHint::Neutral);
    }
}
