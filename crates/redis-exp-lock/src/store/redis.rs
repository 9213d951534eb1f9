//! Redis 锁存储
//!
//! 写入使用 `SET NX PX`，释放使用 Lua 脚本原子比较并删除。

use async_trait::async_trait;
use exp_lock_shared::config::RedisConfig;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::LockStore;
use crate::error::Result;

/// 只有当值匹配时才删除键
///
/// `Script` 通过 EVALSHA 调用，服务端未缓存时自动回退到 EVAL。
static COMPARE_AND_DELETE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if redis.call("GET", KEYS[1]) == ARGV[1] then
            return redis.call("DEL", KEYS[1])
        end
        return 0
        "#,
    )
});

/// 基于 Redis 的锁存储
///
/// 内部持有一个多路复用连接，clone 开销很小，可以在多个锁之间共享。
#[derive(Clone)]
pub struct RedisLockStore {
    conn: MultiplexedConnection,
}

impl RedisLockStore {
    /// 按配置建立连接
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let store = Self::from_client(&client).await?;
        info!("Redis lock store connected");
        Ok(store)
    }

    pub async fn from_client(client: &Client) -> Result<Self> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Redis 拒绝 `PX 0`，不足 1 毫秒的过期时间向上取整
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl LockStore for RedisLockStore {
    #[instrument(skip(self, value))]
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        // 成功返回 "OK"，键已存在时返回 nil
        let result: Option<String> = cmd.query_async(&mut conn).await?;
        debug!(key = %key, acquired = result.is_some(), "SET NX issued");
        Ok(result.is_some())
    }

    #[instrument(skip(self, expected))]
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let deleted: u64 = COMPARE_AND_DELETE
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}
