//! 基于 Redis 的可过期互斥锁
//!
//! 多个互不通信的进程通过同一个键协调对某个资源的独占访问。
//! 获取使用 `SET NX PX`，释放使用 Lua 脚本原子地“值相等才删除”。
//!
//! 这是单实例的尽力而为锁，不提供跨故障转移或网络分区的互斥保证。
//!
//! ## 模块结构
//!
//! - `lock`: `ExpiringLock` 状态机与 `LockOptions`
//! - `store`: 存储抽象，以及 Redis / 内存实现
//! - `retry`: 重试间隔计算
//! - `error`: 错误类型定义

pub mod error;
pub mod lock;
pub mod retry;
pub mod store;

pub use error::{LockError, Result};
pub use lock::{ExpiringLock, LockOptions};
pub use retry::RetrySchedule;
pub use store::{LockStore, MemoryLockStore, RedisLockStore};
