//! 可过期锁模块
//!
//! ## 使用示例
//!
//! ```ignore
//! let store = Arc::new(RedisLockStore::connect(&config.redis).await?);
//! let options = LockOptions::default()
//!     .with_expiry(Duration::from_secs(30))
//!     .with_retries(10);
//! let mut lock = ExpiringLock::new("reports:nightly", store, options)?;
//!
//! // 临界区结束（包括 panic）后自动释放
//! lock.with_lock(|attempts| async move {
//!     do_critical_work(attempts).await
//! })
//! .await??;
//! ```

mod expiring_lock;
mod options;

pub use expiring_lock::ExpiringLock;
pub use options::LockOptions;
