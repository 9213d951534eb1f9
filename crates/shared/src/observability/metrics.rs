//! Prometheus 指标模块
//!
//! 基于 metrics crate 记录锁的获取、竞争与释放情况。未安装 recorder 时
//! 所有记录函数都是空操作，因此库代码可以无条件调用。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装 Prometheus recorder
///
/// 不启动 HTTP 服务，宿主进程通过 [`render`] 把指标挂到自己的端点上。
pub fn init(service_name: &str) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_lock_metrics(service_name);

    Ok(handle)
}

fn register_lock_metrics(service_name: &str) {
    metrics::describe_counter!(
        "lock_try_acquire_total",
        "Total number of single lock acquisition attempts"
    );
    metrics::describe_counter!(
        "lock_acquire_total",
        "Total number of lock acquisitions including retries"
    );
    metrics::describe_histogram!(
        "lock_acquire_attempts",
        "Attempts spent per lock acquisition"
    );
    metrics::describe_histogram!(
        "lock_acquire_duration_seconds",
        "Lock acquisition duration in seconds"
    );
    metrics::describe_counter!("lock_release_total", "Total number of lock releases");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 渲染当前指标快照，未初始化时返回 None
pub fn render() -> Option<String> {
    get_handle().map(|handle| handle.render())
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录一次 SET NX 尝试
#[inline]
pub fn record_try_acquire(acquired: bool) {
    let result = if acquired { "acquired" } else { "contended" };
    metrics::counter!("lock_try_acquire_total", "result" => result).increment(1);
}

/// 记录一次带重试的获取
///
/// `result` 取值：acquired / unavailable / error
#[inline]
pub fn record_acquire(result: &'static str, attempts: u32, duration_secs: f64) {
    metrics::counter!("lock_acquire_total", "result" => result).increment(1);
    metrics::histogram!("lock_acquire_attempts", "result" => result).record(attempts as f64);
    metrics::histogram!("lock_acquire_duration_seconds", "result" => result)
        .record(duration_secs);
}

/// 记录释放结果
///
/// `released` 为 false 表示锁在释放前已过期或被他人持有。
#[inline]
pub fn record_release(released: bool) {
    let result = if released { "released" } else { "stale" };
    metrics::counter!("lock_release_total", "result" => result).increment(1);
}
