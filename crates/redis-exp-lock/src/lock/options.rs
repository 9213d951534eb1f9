use exp_lock_shared::config::LockSettings;
use std::time::Duration;

use crate::retry::RetrySchedule;

/// 锁配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// 锁记录的过期时间，`None` 表示永不过期
    pub expiry: Option<Duration>,
    /// 首次尝试失败后的额外重试次数
    pub retries: u32,
    /// 重试间隔
    pub retry_interval: Duration,
    /// 重试间隔的随机抖动上限
    pub retry_jitter: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            expiry: None,
            retries: 0,
            retry_interval: Duration::from_millis(10),
            retry_jitter: Duration::ZERO,
        }
    }
}

impl LockOptions {
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn without_expiry(mut self) -> Self {
        self.expiry = None;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_retry_jitter(mut self, jitter: Duration) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// 总尝试次数（首次 + 重试）
    ///
    /// 上限为 `u32::MAX`，`retries = u32::MAX` 时同样只尝试 `u32::MAX` 次。
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule {
            interval: self.retry_interval,
            jitter: self.retry_jitter,
        }
    }
}

impl From<&LockSettings> for LockOptions {
    fn from(settings: &LockSettings) -> Self {
        Self {
            expiry: settings.expiry_ms.map(Duration::from_millis),
            retries: settings.retries,
            retry_interval: Duration::from_millis(settings.retry_interval_ms),
            retry_jitter: Duration::from_millis(settings.retry_jitter_ms),
        }
    }
}
