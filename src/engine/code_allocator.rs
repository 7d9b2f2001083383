// ==========================================
// 质检点检表管理系统 - 检验编码分配引擎
// ==========================================
// 红线: 编码全局唯一，创建后不可变
// 红线: 同一 (工厂, 区域, 日期) 内序号单调递增，不回绕
// ==========================================
// 编码格式: PLANT(2) + ZONE(1+) + YYMMDD(6) + SEQ(4)
// 例: KB + A + 251222 + 0001 = KBA2512220001
// 流程: 前缀 → 查当前最大编码 → 序号+1 → 复核不存在 → 冲突则退避重试
// ==========================================

use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// 序号位数
pub const SEQUENCE_WIDTH: usize = 4;

/// 单日单前缀最大序号
pub const MAX_SEQUENCE: u32 = 9999;

/// 工厂代码长度
pub const PLANT_CODE_LEN: usize = 2;

// ==========================================
// CodeStore - 编码存储查询接口
// ==========================================
// 由仓储层实现（rusqlite Connection / 事务）；测试中可替换为内存实现
pub trait CodeStore {
    /// 查询指定前缀下的最大编码
    ///
    /// 只考虑长度为 `code_len` 且末 4 位为数字的编码
    fn find_max_code_with_prefix(
        &self,
        prefix: &str,
        code_len: usize,
    ) -> Result<Option<String>, RepositoryError>;

    /// 编码是否已存在
    fn code_exists(&self, code: &str) -> Result<bool, RepositoryError>;
}

// ==========================================
// AllocationError - 分配错误
// ==========================================
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("编码组成部分非法 ({field}='{value}'): {reason}")]
    InvalidCodePart {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("编码分配重试耗尽: prefix={prefix}, attempts={attempts}")]
    Exhausted { prefix: String, attempts: u32 },

    #[error("当日序号已用尽: prefix={prefix}")]
    SequenceOverflow { prefix: String },

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

// ==========================================
// AllocationPolicy - 重试策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::config_manager::DEFAULT_ALLOCATION_MAX_ATTEMPTS,
            backoff: Duration::from_millis(crate::config::config_manager::DEFAULT_ALLOCATION_BACKOFF_MS),
        }
    }
}

// ==========================================
// 编码组装（纯函数）
// ==========================================

/// 组装当日前缀: plant + zone + YYMMDD
///
/// # 校验
/// - plant: 恰好 2 位 ASCII 字母数字
/// - zone: 至少 1 位 ASCII 字母数字
pub fn build_prefix(plant: &str, zone: &str, date: NaiveDate) -> Result<String, AllocationError> {
    if plant.len() != PLANT_CODE_LEN || !plant.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AllocationError::InvalidCodePart {
            field: "plant",
            value: plant.to_string(),
            reason: "必须为 2 位字母或数字",
        });
    }
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AllocationError::InvalidCodePart {
            field: "zone",
            value: zone.to_string(),
            reason: "必须为 1 位以上字母或数字",
        });
    }
    Ok(format!("{}{}{}", plant, zone, date.format("%y%m%d")))
}

/// 完整编码长度
pub fn code_len(prefix: &str) -> usize {
    prefix.len() + SEQUENCE_WIDTH
}

/// 由当前最大编码推导下一个候选编码
///
/// - 无历史编码 → 0001
/// - 末 4 位无法解析 → 0001
/// - 已到 9999 → SequenceOverflow
pub fn next_candidate(prefix: &str, last_code: Option<&str>) -> Result<String, AllocationError> {
    let next = match last_code {
        None => 1,
        Some(code) => {
            let tail = code.get(code.len().saturating_sub(SEQUENCE_WIDTH)..).unwrap_or("");
            match tail.parse::<u32>() {
                Ok(n) if n >= MAX_SEQUENCE => {
                    return Err(AllocationError::SequenceOverflow {
                        prefix: prefix.to_string(),
                    })
                }
                Ok(n) => n + 1,
                Err(_) => {
                    tracing::warn!(code = code, "编码序号无法解析，从 0001 开始");
                    1
                }
            }
        }
    };
    Ok(format!("{}{:0width$}", prefix, next, width = SEQUENCE_WIDTH))
}

// ==========================================
// CodeAllocator - 编码分配器
// ==========================================
// 红线: 不持有状态，正确性依赖存储层复核 + 有限重试
pub struct CodeAllocator {
    policy: AllocationPolicy,
}

impl CodeAllocator {
    pub fn new(policy: AllocationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// 单轮提议: 查最大编码 → 推导候选 → 复核
    ///
    /// # 返回
    /// - `Ok(Some(code))`: 候选编码当前不存在
    /// - `Ok(None)`: 候选已被占用（冲突，需要重试）
    pub fn propose(&self, store: &dyn CodeStore, prefix: &str) -> Result<Option<String>, AllocationError> {
        let last = store.find_max_code_with_prefix(prefix, code_len(prefix))?;
        let candidate = next_candidate(prefix, last.as_deref())?;

        if store.code_exists(&candidate)? {
            tracing::debug!(candidate = %candidate, "候选编码已存在");
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// 分配编码（不落库）
    pub fn allocate(
        &self,
        store: &dyn CodeStore,
        plant: &str,
        zone: &str,
        date: NaiveDate,
    ) -> Result<String, AllocationError> {
        self.allocate_with(plant, zone, date, |prefix| self.propose(store, prefix))
    }

    /// 带重试的分配循环
    ///
    /// `attempt` 在一次尝试内完成提议与落库：
    /// - 返回 `Ok(Some(v))` 即成功
    /// - 返回 `Ok(None)` 或唯一约束冲突视为碰撞，退避后重试
    /// - 其他错误直接返回
    ///
    /// # 参数
    /// - plant / zone / date: 编码组成部分
    /// - attempt: 接收当日前缀的单轮尝试
    #[instrument(skip(self, attempt), fields(max_attempts = self.policy.max_attempts))]
    pub fn allocate_with<T, F>(
        &self,
        plant: &str,
        zone: &str,
        date: NaiveDate,
        mut attempt: F,
    ) -> Result<T, AllocationError>
    where
        F: FnMut(&str) -> Result<Option<T>, AllocationError>,
    {
        let prefix = build_prefix(plant, zone, date)?;
        let max_attempts = self.policy.max_attempts.max(1);

        for n in 1..=max_attempts {
            match attempt(&prefix) {
                Ok(Some(value)) => {
                    if n > 1 {
                        tracing::info!(prefix = %prefix, attempt = n, "编码冲突后重试成功");
                    }
                    return Ok(value);
                }
                Ok(None) => {
                    tracing::warn!(prefix = %prefix, attempt = n, "编码冲突");
                }
                Err(AllocationError::Storage(RepositoryError::UniqueConstraintViolation(msg))) => {
                    tracing::warn!(prefix = %prefix, attempt = n, error = %msg, "提交时编码唯一约束冲突");
                }
                Err(e) => return Err(e),
            }

            if n < max_attempts {
                thread::sleep(self.policy.backoff);
            }
        }

        tracing::error!(prefix = %prefix, attempts = max_attempts, "编码分配重试耗尽");
        Err(AllocationError::Exhausted {
            prefix,
            attempts: max_attempts,
        })
    }
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self::new(AllocationPolicy::default())
    }
}
