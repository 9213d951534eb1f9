//! 多个客户端竞争同一把锁
//!
//! ```bash
//! EXPLOCK_REDIS__URL=redis://localhost:6379 \
//! EXPLOCK_LOCK__EXPIRY_MS=5000 EXPLOCK_LOCK__RETRIES=200 \
//!   cargo run -p redis-exp-lock --example contend
//! ```

use exp_lock::{ExpiringLock, LockOptions, RedisLockStore};
use exp_lock_shared::config::AppConfig;
use exp_lock_shared::observability;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const WORKERS: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("exp-lock-contend")?;
    observability::init(&config.service_name, &config.observability)?;

    let store = Arc::new(RedisLockStore::connect(&config.redis).await?);
    store.health_check().await?;

    let options = LockOptions::from(&config.lock);
    info!(?options, "Starting contending workers");

    let mut handles = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let mut lock = ExpiringLock::new("demo:contend", store.clone(), options.clone())?;
        handles.push(tokio::spawn(async move {
            lock.with_lock(|attempts| async move {
                info!(worker, attempts, "Entered critical section");
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
            .await
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await? {
            tracing::warn!(error = %e, code = e.error_code(), "Worker gave up");
        }
    }

    if let Some(rendered) = observability::metrics::render() {
        println!("{rendered}");
    }

    Ok(())
}
