//! 日志初始化
//!
//! `RUST_LOG` 优先于配置中的级别。

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{BeaconError, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 安装全局日志订阅者
///
/// 已经安装过订阅者时返回配置错误。
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(false).with_target(true))
            .try_init(),
    };

    installed.map_err(|e| BeaconError::config(format!("failed to install logger: {}", e)))
}

/// 测试用日志：输出交给测试框架捕获，可重复调用
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(BeaconError::config(format!("invalid log level: {}", level))),
    }
}
