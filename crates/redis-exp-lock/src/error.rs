//! 锁错误类型
//!
//! 竞争失败与过期释放都不是错误，它们以 `bool` 返回值体现；
//! 这里只包含调用方必须显式处理的情况。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("无效的锁键: 键不能为空")]
    InvalidKey,

    #[error("锁已被当前实例持有: key={key}")]
    AlreadyAcquired { key: String },

    #[error("获取锁失败，已尝试 {attempts} 次: key={key}")]
    LockUnavailable { key: String, attempts: u32 },

    #[error("Redis 错误: {0}")]
    Redis(#[from] redis::RedisError),
}

/// 锁操作 Result 类型别名
pub type Result<T> = std::result::Result<T, LockError>;

impl LockError {
    /// 是否可以由调用方在更高层重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockUnavailable { .. } | Self::Redis(_))
    }

    /// 是否为调用方用法错误
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::InvalidKey | Self::AlreadyAcquired { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidKey => "INVALID_KEY",
            Self::AlreadyAcquired { .. } => "ALREADY_ACQUIRED",
            Self::LockUnavailable { .. } => "LOCK_UNAVAILABLE",
            Self::Redis(_) => "REDIS_ERROR",
        }
    }
}
