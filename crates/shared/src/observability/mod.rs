//! 统一可观测性模块
//!
//! 提供日志与指标的统一初始化。锁客户端只依赖 `metrics` / `tracing` 门面，
//! 是否真正输出由宿主进程调用 [`init`] 决定。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus recorder，仅在 `metrics_enabled` 时安装）
///
/// # Example
///
/// ```ignore
/// use exp_lock_shared::config::AppConfig;
/// use exp_lock_shared::observability;
///
/// let config = AppConfig::load("lock-demo")?;
/// observability::init(&config.service_name, &config.observability)?;
/// ```
pub fn init(service_name: &str, config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    if config.metrics_enabled {
        metrics::init(service_name)?;
    }

    info!(
        service = %service_name,
        log_format = %config.log_format,
        metrics_enabled = config.metrics_enabled,
        "Observability initialized"
    );

    Ok(())
}
