//! 获取锁时的重试间隔
//!
//! 锁竞争通常很短暂，因此采用固定间隔而不是指数退避。高竞争场景可以
//! 配置随机抖动，让多个等待者错开重试时间。

use rand::Rng;
use std::time::Duration;

/// 重试间隔计算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    /// 固定等待时间
    pub interval: Duration,
    /// 随机抖动上限，实际抖动在 `[0, jitter]` 内均匀分布
    pub jitter: Duration,
}

impl RetrySchedule {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            jitter: Duration::ZERO,
        }
    }

    /// 下一次重试前应等待的时间
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }

        let max_micros = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max_micros);
        self.interval.saturating_add(Duration::from_micros(extra))
    }

    /// 不含抖动时，`retries` 次重试的总等待时间
    pub fn base_budget(&self, retries: u32) -> Duration {
        self.interval.saturating_mul(retries)
    }
}
