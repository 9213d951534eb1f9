//! 锁存储抽象
//!
//! 锁本身只依赖两种原子原语：带可选过期时间的“不存在才写入”，以及
//! “值相等才删除”。后者必须在存储端一次性完成，不能由客户端先读再删，
//! 否则过期后被他人重新持有的锁可能被误删。
//!
//! 另外两个只读查询用于判断键是否存在、当前持有者是谁。

mod memory;
mod redis;

pub use self::memory::MemoryLockStore;
pub use self::redis::RedisLockStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// 锁存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockStore: Send + Sync {
    /// 仅在键不存在时写入，`ttl` 存在时由存储负责到期删除
    ///
    /// 返回写入是否生效。
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// 当前值等于 `expected` 时删除，返回删除的记录数（0 或 1）
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
}
