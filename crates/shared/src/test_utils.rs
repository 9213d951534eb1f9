//! 测试工具模块
//!
//! 提供集成测试所需的配置和唯一键生成，保证并行测试互不干扰。

use uuid::Uuid;

use crate::config::RedisConfig;

/// 创建测试用 Redis 配置
///
/// 优先使用 REDIS_URL / TEST_REDIS_URL，否则使用本地 1 号库
pub fn test_redis_config() -> RedisConfig {
    RedisConfig {
        url: std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("TEST_REDIS_URL"))
            .unwrap_or_else(|_| "redis://localhost:6379/1".to_string()),
    }
}

/// 生成唯一的测试锁键
pub fn test_lock_key(scope: &str) -> String {
    format!("test:lock:{}:{}", scope, Uuid::new_v4())
}
