//! 服务注册模块
//!
//! 注册中心适配器抽象、Consul 实现，以及保持注册存活的心跳脉冲

pub mod consul;
pub mod pulse;
pub mod status;
pub mod trait_def;
pub mod types;

use crate::config::RegistryConfig;
use crate::error::{BeaconError, Result};
pub use consul::ConsulAdapter;
pub use pulse::{DEFAULT_HEARTBEAT_INTERVAL, HeartbeatPulse};
pub use status::{AdapterStatus, StatusCell};
use std::sync::Arc;
pub use trait_def::RegistryAdapter;
pub use types::{
    AgentService, CatalogService, DEFAULT_TTL, HealthCheck, Node, ServiceEntry,
    ServiceRegistration, parse_ttl,
};

/// 注册中心类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryType {
    Consul,
}

impl std::str::FromStr for RegistryType {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            consul::CONSUL_TYPE => Ok(RegistryType::Consul),
            other => Err(BeaconError::config(format!(
                "invalid adapter scheme {}",
                other
            ))),
        }
    }
}

/// 根据 `adapter_uri` 创建注册中心适配器
///
/// `consul://host:port` 会创建 Consul 适配器并探测一次连接。
pub async fn create_adapter(config: &RegistryConfig) -> Result<Arc<dyn RegistryAdapter>> {
    let uri = reqwest::Url::parse(&config.adapter_uri).map_err(|e| {
        BeaconError::config(format!("invalid adapter URI {}: {}", config.adapter_uri, e))
    })?;

    match uri.scheme().parse::<RegistryType>()? {
        RegistryType::Consul => {
            let address = match (uri.host_str(), uri.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => format!("{}:8500", host),
                _ => String::new(),
            };
            let adapter = ConsulAdapter::connect(&address).await?;
            Ok(Arc::new(adapter))
        }
    }
}
