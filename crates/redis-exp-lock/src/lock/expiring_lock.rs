//! 可过期的互斥锁
//!
//! 本地状态（是否认为自己持有锁）与存储中的记录是两个独立的事实来源：
//! 记录可能在本地毫不知情时过期或被删除。`is_locally_held` 只读本地，
//! `is_owned_by_me` 才是“此刻是否真的持有锁”的权威判断。

use exp_lock_shared::observability::metrics;
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::options::LockOptions;
use crate::error::{LockError, Result};
use crate::store::LockStore;

/// 基于存储原子原语的可过期锁
///
/// 同一个实例不能被多个任务并发使用，状态变更操作都需要 `&mut self`。
/// 不同实例（无论是否在同一进程）通过同一个键竞争，互斥由存储保证。
pub struct ExpiringLock<S: LockStore + ?Sized> {
    key: String,
    store: Arc<S>,
    options: LockOptions,
    /// 本次持有的令牌，未持有时为 None
    token: Option<String>,
}

impl<S: LockStore + ?Sized> std::fmt::Debug for ExpiringLock<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringLock")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("locked", &self.token.is_some())
            .finish()
    }
}

impl<S: LockStore + ?Sized> ExpiringLock<S> {
    /// 创建锁，键为空时返回 `InvalidKey`
    pub fn new(key: impl Into<String>, store: Arc<S>, options: LockOptions) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(LockError::InvalidKey);
        }

        Ok(Self {
            key,
            store,
            options,
            token: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// 当前持有的令牌
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 本地是否认为持有锁，不访问存储
    pub fn is_locally_held(&self) -> bool {
        self.token.is_some()
    }

    /// 存储中是否存在该键的记录（任何持有者）
    pub async fn is_key_present(&self) -> Result<bool> {
        self.store.exists(&self.key).await
    }

    /// 本地持有且存储中的值仍是自己的令牌
    pub async fn is_owned_by_me(&self) -> Result<bool> {
        let Some(token) = self.token.as_deref() else {
            return Ok(false);
        };

        let current = self.store.get(&self.key).await?;
        Ok(current.as_deref() == Some(token))
    }

    /// 尝试获取一次锁
    ///
    /// 键已被占用时返回 `Ok(false)`，这是正常的竞争结果而不是错误。
    /// 已持有锁时调用返回 `AlreadyAcquired`。
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn try_acquire(&mut self) -> Result<bool> {
        if self.token.is_some() {
            return Err(LockError::AlreadyAcquired {
                key: self.key.clone(),
            });
        }

        let token = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .set_if_absent(&self.key, &token, self.options.expiry)
            .await?;

        metrics::record_try_acquire(acquired);

        if acquired {
            debug!(token = %token, expiry = ?self.options.expiry, "Lock acquired");
            self.token = Some(token);
        } else {
            debug!("Lock is held by another client");
        }

        Ok(acquired)
    }

    /// 获取锁，失败时按配置间隔重试
    ///
    /// 成功时返回成功的那次尝试序号（从 1 开始）。全部
    /// `retries + 1` 次尝试失败后返回 `LockUnavailable`。
    /// 存储错误和 `AlreadyAcquired` 不会重试，直接返回。
    #[instrument(skip(self), fields(key = %self.key, retries = self.options.retries))]
    pub async fn acquire(&mut self) -> Result<u32> {
        let started = Instant::now();
        let max_attempts = self.options.max_attempts();
        let schedule = self.options.retry_schedule();

        for attempt in 1..=max_attempts {
            match self.try_acquire().await {
                Ok(true) => {
                    metrics::record_acquire("acquired", attempt, started.elapsed().as_secs_f64());
                    if attempt > 1 {
                        debug!(attempt, "Lock acquired after retrying");
                    }
                    return Ok(attempt);
                }
                Ok(false) => {}
                Err(e) => {
                    metrics::record_acquire("error", attempt, started.elapsed().as_secs_f64());
                    return Err(e);
                }
            }

            if attempt < max_attempts {
                let delay = schedule.next_delay();
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Lock not acquired, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        metrics::record_acquire("unavailable", max_attempts, started.elapsed().as_secs_f64());
        warn!(attempts = max_attempts, "Lock unavailable, retries exhausted");

        Err(LockError::LockUnavailable {
            key: self.key.clone(),
            attempts: max_attempts,
        })
    }

    /// 释放锁
    ///
    /// 未持有时直接返回 `Ok(false)`，不访问存储。否则原子地“值相等才删除”，
    /// 无论删除是否生效，本地状态都会清空。返回 true 表示删除的确实是
    /// 自己的记录；false 表示记录已过期、已被他人重新持有或不存在。
    ///
    /// 存储调用本身失败时保留令牌，调用方可以再次释放。
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn release(&mut self) -> Result<bool> {
        let Some(token) = self.token.as_deref() else {
            return Ok(false);
        };

        let deleted = self.store.compare_and_delete(&self.key, token).await?;
        let released = deleted == 1;

        if released {
            debug!("Lock released");
        } else {
            warn!(token = %token, "Lock had expired or was taken by another client before release");
        }

        metrics::record_release(released);
        self.token = None;
        Ok(released)
    }

    /// 在持有锁期间执行临界区
    ///
    /// 先通过 [`acquire`](Self::acquire) 获取锁，把尝试次数传给临界区，
    /// 临界区结束后释放锁。临界区 panic 时同样会先释放锁再继续 panic；
    /// 临界区返回的 `Result` 原样交给调用方，不影响释放。
    ///
    /// 返回的 future 在临界区执行期间被丢弃（如 `tokio::time::timeout`、`select!`）时，
    /// 本地状态立即清空，删除操作在当前 tokio 运行时上后台执行。
    ///
    /// 临界区正常结束但释放时存储调用失败，会返回该存储错误，临界区的结果随之丢弃；
    /// 此时令牌保留，`is_locally_held` 仍为 true，调用方可以再次 [`release`](Self::release)。
    pub async fn with_lock<F, Fut, T>(&mut self, critical_section: F) -> Result<T>
    where
        S: 'static,
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = T>,
    {
        let attempts = self.acquire().await?;
        let mut guard = ReleaseOnDrop {
            lock: self,
            armed: true,
        };

        let outcome = AssertUnwindSafe(async move { critical_section(attempts).await })
            .catch_unwind()
            .await;

        let released = guard.lock.release().await;
        guard.armed = false;

        match outcome {
            Ok(value) => {
                released?;
                Ok(value)
            }
            Err(payload) => {
                if let Err(e) = released {
                    warn!(key = %guard.lock.key, error = %e, "Failed to release lock after critical section panicked");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// `with_lock` 的 future 被中途丢弃时负责释放锁
///
/// Drop 中无法 await，因此删除操作交给当前运行时后台执行；
/// 没有运行时时只能清空本地状态，记录依赖 TTL 过期。
struct ReleaseOnDrop<'a, S: LockStore + ?Sized + 'static> {
    lock: &'a mut ExpiringLock<S>,
    armed: bool,
}

impl<S: LockStore + ?Sized + 'static> Drop for ReleaseOnDrop<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(token) = self.lock.token.take() else {
            return;
        };
        let key = self.lock.key.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(key = %key, "Critical section cancelled, releasing lock in background");
                let store = self.lock.store.clone();
                handle.spawn(async move {
                    match store.compare_and_delete(&key, &token).await {
                        Ok(deleted) => {
                            metrics::record_release(deleted == 1);
                            debug!(key = %key, released = deleted == 1, "Background release finished");
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "Background release failed - lock will expire via TTL");
                        }
                    }
                });
            }
            Err(_) => {
                warn!(
                    key = %key,
                    token = %token,
                    "Critical section dropped outside a runtime - lock will expire via TTL"
                );
            }
        }
    }
}
