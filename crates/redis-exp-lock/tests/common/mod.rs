//! 锁行为场景
//!
//! 场景与存储实现无关，内存存储和 Redis 存储的测试共用同一套断言。

use exp_lock::{ExpiringLock, LockError, LockOptions, LockStore};
use exp_lock_shared::test_utils::test_lock_key;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub const FAST_EXPIRY: Duration = Duration::from_millis(100);
pub const PAST_EXPIRY: Duration = Duration::from_millis(200);

/// 同一个键上的多个客户端
pub struct Harness<S: LockStore> {
    pub store: Arc<S>,
    pub key: String,
}

impl<S: LockStore> Harness<S> {
    pub fn new(store: S, scope: &str) -> Self {
        Self {
            store: Arc::new(store),
            key: test_lock_key(scope),
        }
    }

    pub fn lock(&self) -> ExpiringLock<S> {
        self.with_options(LockOptions::default())
    }

    pub fn fast_expiring_lock(&self) -> ExpiringLock<S> {
        self.with_options(LockOptions::default().with_expiry(FAST_EXPIRY))
    }

    pub fn retry_lock(&self, retries: u32) -> ExpiringLock<S> {
        self.with_options(
            LockOptions::default()
                .with_retries(retries)
                .with_retry_interval(Duration::from_millis(10)),
        )
    }

    pub fn with_options(&self, options: LockOptions) -> ExpiringLock<S> {
        ExpiringLock::new(self.key.clone(), self.store.clone(), options).expect("valid key")
    }
}

async fn failing_section(_attempts: u32) {
    panic!("critical section failed");
}

pub async fn never_locked_instance_reports_nothing<S: LockStore>(h: Harness<S>) {
    let mut lock = h.lock();

    assert!(!lock.is_locally_held());
    assert!(!lock.is_key_present().await.unwrap());
    assert!(!lock.is_owned_by_me().await.unwrap());
    assert!(!lock.release().await.unwrap());
}

pub async fn acquire_then_release<S: LockStore>(h: Harness<S>) {
    let mut lock = h.lock();
    let other = h.lock();

    assert_eq!(lock.acquire().await.unwrap(), 1);
    assert!(lock.is_locally_held());
    assert!(lock.is_key_present().await.unwrap());
    assert!(lock.is_owned_by_me().await.unwrap());
    assert!(other.is_key_present().await.unwrap());
    assert!(!other.is_owned_by_me().await.unwrap());

    assert!(lock.release().await.unwrap());
    assert!(!lock.is_locally_held());
    assert!(!lock.is_key_present().await.unwrap());
    assert!(!lock.is_owned_by_me().await.unwrap());
}

pub async fn reacquire_while_held_is_rejected<S: LockStore>(h: Harness<S>) {
    let mut lock = h.lock();
    assert!(lock.try_acquire().await.unwrap());

    assert!(matches!(
        lock.try_acquire().await,
        Err(LockError::AlreadyAcquired { .. })
    ));
    assert!(matches!(
        lock.acquire().await,
        Err(LockError::AlreadyAcquired { .. })
    ));
    assert!(lock.is_owned_by_me().await.unwrap());
}

pub async fn second_client_waits_for_release<S: LockStore>(h: Harness<S>) {
    let mut lock = h.lock();
    let mut other = h.lock();

    lock.acquire().await.unwrap();
    assert!(!other.try_acquire().await.unwrap());
    assert!(!other.is_locally_held());

    lock.release().await.unwrap();
    assert!(other.try_acquire().await.unwrap());
    assert!(other.is_owned_by_me().await.unwrap());
}

pub async fn expired_lock_can_be_taken<S: LockStore>(h: Harness<S>) {
    let mut lock = h.fast_expiring_lock();
    let mut other = h.lock();

    assert!(lock.try_acquire().await.unwrap());
    assert!(lock.is_owned_by_me().await.unwrap());

    tokio::time::sleep(PAST_EXPIRY).await;

    assert!(lock.is_locally_held());
    assert!(!lock.is_owned_by_me().await.unwrap());
    assert!(other.try_acquire().await.unwrap());
}

pub async fn non_expiring_lock_stays_owned<S: LockStore>(h: Harness<S>) {
    let mut lock = h.with_options(LockOptions::default().without_expiry());
    lock.try_acquire().await.unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(lock.is_owned_by_me().await.unwrap());
    }

    lock.release().await.unwrap();
}

pub async fn stale_release_leaves_new_holder_alone<S: LockStore>(h: Harness<S>) {
    let mut lock = h.fast_expiring_lock();
    let mut other = h.lock();

    lock.acquire().await.unwrap();
    tokio::time::sleep(PAST_EXPIRY).await;
    assert!(other.try_acquire().await.unwrap());

    assert!(!lock.release().await.unwrap());

    assert!(!lock.is_locally_held());
    assert!(other.is_owned_by_me().await.unwrap());
}

pub async fn release_after_expiry_returns_false<S: LockStore>(h: Harness<S>) {
    let mut lock = h.fast_expiring_lock();

    lock.acquire().await.unwrap();
    tokio::time::sleep(PAST_EXPIRY).await;

    assert!(!lock.release().await.unwrap());
    assert!(!lock.is_locally_held());
}

pub async fn retry_until_holder_releases<S: LockStore + 'static>(h: Harness<S>) {
    let mut holder = h.lock();
    let mut waiter = h.retry_lock(10);

    holder.acquire().await.unwrap();
    let releaser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        holder.release().await.unwrap()
    });

    let attempts = waiter.acquire().await.unwrap();
    assert!(attempts > 1, "attempts = {attempts}");
    assert!(attempts <= 11, "attempts = {attempts}");
    assert!(releaser.await.unwrap());
    assert!(waiter.is_owned_by_me().await.unwrap());
}

pub async fn retry_budget_is_exhausted<S: LockStore>(h: Harness<S>) {
    let mut holder = h.lock();
    let mut waiter = h.with_options(
        LockOptions::default()
            .with_retries(3)
            .with_retry_interval(Duration::from_millis(5)),
    );

    holder.acquire().await.unwrap();

    let err = waiter.acquire().await.unwrap_err();
    assert!(matches!(err, LockError::LockUnavailable { attempts: 4, .. }));
    assert!(holder.is_owned_by_me().await.unwrap());
}

pub async fn with_lock_excludes_others<S: LockStore + 'static>(h: Harness<S>) {
    let mut lock = h.lock();
    let mut other = h.lock();

    let contended = lock
        .with_lock(|attempts| {
            assert_eq!(attempts, 1);
            let other = &mut other;
            async move { other.try_acquire().await.unwrap() }
        })
        .await
        .unwrap();
    assert!(!contended);

    assert!(!lock.is_locally_held());
    assert!(other.try_acquire().await.unwrap());
}

pub async fn with_lock_tolerates_expiry_inside_section<S: LockStore + 'static>(h: Harness<S>) {
    let mut lock = h.fast_expiring_lock();
    let mut other = h.lock();

    let taken = lock
        .with_lock(|_| {
            let other = &mut other;
            async move {
                tokio::time::sleep(PAST_EXPIRY).await;
                other.try_acquire().await.unwrap()
            }
        })
        .await
        .unwrap();

    assert!(taken);
    assert!(!lock.is_locally_held());
    assert!(other.is_owned_by_me().await.unwrap());
}

pub async fn with_lock_releases_after_panic<S: LockStore + 'static>(h: Harness<S>) {
    let mut lock = h.lock();
    let mut other = h.lock();

    let outcome = AssertUnwindSafe(lock.with_lock(failing_section))
        .catch_unwind()
        .await;

    assert!(outcome.is_err());
    assert!(!lock.is_locally_held());
    assert!(!lock.is_key_present().await.unwrap());
    assert!(other.try_acquire().await.unwrap());
}

pub async fn with_lock_releases_after_error<S: LockStore + 'static>(h: Harness<S>) {
    let mut lock = h.lock();

    let outcome = lock
        .with_lock(|_| async { Err::<(), _>(anyhow::anyhow!("section failed")) })
        .await
        .unwrap();

    assert!(outcome.is_err());
    assert!(!lock.is_locally_held());
    assert!(!lock.is_key_present().await.unwrap());
}

pub async fn with_lock_releases_after_cancellation<S: LockStore + 'static>(h: Harness<S>) {
    let mut lock = h.lock();
    let mut other = h.lock();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        lock.with_lock(|_| tokio::time::sleep(Duration::from_secs(5))),
    )
    .await;

    assert!(timed_out.is_err());
    assert!(!lock.is_locally_held());

    // 删除在后台任务中完成
    let mut key_present = true;
    for _ in 0..50 {
        key_present = lock.is_key_present().await.unwrap();
        if !key_present {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!key_present);

    assert!(other.try_acquire().await.unwrap());
    assert!(other.release().await.unwrap());
    assert_eq!(lock.with_lock(|attempts| async move { attempts }).await.unwrap(), 1);
}
