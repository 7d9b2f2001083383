// ==========================================
// 质检点检表管理系统 - 测量判定引擎
// ==========================================
// 红线: is_pass 与 is_fail 互斥
// 红线: 规格上下限只对数值类测量保存
// ==========================================
// 判定规则:
// - number: 去空白后解析为普通十进制数（不接受指数写法）；无法解析或超出 [min, max] → 不合格
// - leftright: 始终合格（仅记录左/右，不做判定）
// - passfail: 直接采用提交的勾选结果；都未勾选 → 未判定
// ==========================================

use crate::domain::types::MeasurementKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 测量规格（提交时的快照）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub standard: Option<f64>,
}

/// 判定输入
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub kind: MeasurementKind,
    pub raw_value: Option<&'a str>,
    pub spec: MeasurementSpec,
    pub submitted_pass: bool,
    pub submitted_fail: bool,
}

/// 判定结果
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_pass: bool,
    pub is_fail: bool,
    pub stored_value: Option<String>,
    pub numeric_value: Option<f64>,
    pub pass_fail_value: Option<bool>,
    pub spec: MeasurementSpec,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("合格与不合格不能同时勾选")]
    ConflictingVerdict,
}

// ==========================================
// MeasurementClassifier - 测量判定器
// ==========================================
// 无状态，纯计算
#[derive(Debug, Default, Clone, Copy)]
pub struct MeasurementClassifier;

impl MeasurementClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 判定单条测量
    ///
    /// # 返回
    /// - `Ok(Classification)`: 判定结果与待存储值
    /// - `Err(ConflictingVerdict)`: passfail 类型同时勾选合格与不合格
    pub fn classify(&self, input: ClassifyInput<'_>) -> Result<Classification, ClassifyError> {
        let stored_value = input
            .raw_value
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty());

        match input.kind {
            MeasurementKind::Number => {
                let numeric = parse_finite(input.raw_value);
                let in_range = numeric
                    .map(|v| within(v, input.spec.min, input.spec.max))
                    .unwrap_or(false);

                Ok(Classification {
                    is_pass: in_range,
                    is_fail: !in_range,
                    stored_value,
                    numeric_value: numeric,
                    pass_fail_value: None,
                    spec: input.spec,
                })
            }
            MeasurementKind::LeftRight => Ok(Classification {
                is_pass: true,
                is_fail: false,
                stored_value,
                numeric_value: None,
                pass_fail_value: Some(true),
                spec: MeasurementSpec::default(),
            }),
            MeasurementKind::PassFail => {
                if input.submitted_pass && input.submitted_fail {
                    return Err(ClassifyError::ConflictingVerdict);
                }
                let verdict = if input.submitted_pass {
                    Some(true)
                } else if input.submitted_fail {
                    Some(false)
                } else {
                    None
                };
                Ok(Classification {
                    is_pass: input.submitted_pass,
                    is_fail: input.submitted_fail,
                    stored_value,
                    numeric_value: None,
                    pass_fail_value: verdict,
                    spec: MeasurementSpec::default(),
                })
            }
        }
    }
}

/// 解析普通十进制数
///
/// 接受: 可选正负号 + 数字 + 可选小数部分（"12" / "-0.5" / ".5" / "5."）
/// 拒绝: 指数写法 (1e1)、千分位、NaN / inf
fn parse_finite(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !digits_only(int_part) || !digits_only(frac_part) || int_part.len() + frac_part.len() == 0 {
        return None;
    }

    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 闭区间判定；缺失的边界视为无界
fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(min: f64, std: f64, max: f64) -> MeasurementSpec {
        MeasurementSpec {
            min: Some(min),
            max: Some(max),
            standard: Some(std),
        }
    }

    fn number(raw: &str, spec: MeasurementSpec) -> Classification {
        MeasurementClassifier::new()
            .classify(ClassifyInput {
                kind: MeasurementKind::Number,
                raw_value: Some(raw),
                spec,
                submitted_pass: false,
                submitted_fail: false,
            })
            .unwrap()
    }

    #[test]
    fn test_number_boundaries_inclusive() {
        let s = spec(38.1, 44.45, 50.8);

        let c = number("38.1", s);
        assert!(c.is_pass && !c.is_fail, "下限应判定合格");

        let c = number("50.8", s);
        assert!(c.is_pass && !c.is_fail, "上限应判定合格");

        let c = number("38.09", s);
        assert!(!c.is_pass && c.is_fail);

        let c = number("50.81", s);
        assert!(!c.is_pass && c.is_fail);
    }

    #[test]
    fn test_number_captures_value_and_spec() {
        let s = spec(38.1, 44.45, 50.8);
        let c = number(" 44.2 ", s);

        assert!(c.is_pass);
        assert_eq!(c.numeric_value, Some(44.2));
        assert_eq!(c.stored_value.as_deref(), Some(" 44.2 "));
        assert_eq!(c.spec, s);
    }

    #[test]
    fn test_number_unparsable_fails() {
        let s = spec(1.0, 2.0, 3.0);
        for raw in ["abc", "", "   ", "NaN", "inf", "1,5", "1e1", "2E0", "+-1", ".", "-", "0x2"] {
            let c = number(raw, s);
            assert!(c.is_fail && !c.is_pass, "'{}' 应判定不合格", raw);
            assert_eq!(c.numeric_value, None);
        }
    }

    #[test]
    fn test_number_accepts_plain_decimals() {
        let s = spec(-1.0, 2.0, 3.0);
        for (raw, expected) in [("2", 2.0), ("+2.5", 2.5), ("-0.5", -0.5), (".5", 0.5), ("3.", 3.0)] {
            let c = number(raw, s);
            assert_eq!(c.numeric_value, Some(expected), "'{}'", raw);
            assert!(c.is_pass);
        }
    }

    #[test]
    fn test_number_missing_bound_is_unbounded() {
        let s = MeasurementSpec {
            min: Some(10.0),
            max: None,
            standard: None,
        };
        assert!(number("1000000", s).is_pass);
        assert!(number("9.99", s).is_fail);
    }

    #[test]
    fn test_leftright_always_passes() {
        let c = MeasurementClassifier::new()
            .classify(ClassifyInput {
                kind: MeasurementKind::LeftRight,
                raw_value: Some("L"),
                spec: spec(1.0, 2.0, 3.0),
                submitted_pass: false,
                submitted_fail: true,
            })
            .unwrap();

        assert!(c.is_pass && !c.is_fail);
        assert_eq!(c.stored_value.as_deref(), Some("L"));
        assert_eq!(c.spec, MeasurementSpec::default(), "非数值类型不保存规格");
    }

    #[test]
    fn test_passfail_mirrors_submission() {
        let classifier = MeasurementClassifier::new();
        let input = |p, f| ClassifyInput {
            kind: MeasurementKind::PassFail,
            raw_value: None,
            spec: MeasurementSpec::default(),
            submitted_pass: p,
            submitted_fail: f,
        };

        let c = classifier.classify(input(true, false)).unwrap();
        assert!(c.is_pass && !c.is_fail);
        assert_eq!(c.pass_fail_value, Some(true));

        let c = classifier.classify(input(false, true)).unwrap();
        assert!(!c.is_pass && c.is_fail);
        assert_eq!(c.pass_fail_value, Some(false));

        let c = classifier.classify(input(false, false)).unwrap();
        assert!(!c.is_pass && !c.is_fail, "未勾选为未判定");
        assert_eq!(c.pass_fail_value, None);

        assert_eq!(
            classifier.classify(input(true, true)),
            Err(ClassifyError::ConflictingVerdict)
        );
    }
}
