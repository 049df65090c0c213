use crate::discovery::RefreshFailurePolicy;
use crate::error::{BeaconError, Result};
use crate::registry::{DEFAULT_TTL, ServiceRegistration};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    /// 为空时生成 "<name>-<uuid>"
    #[serde(default)]
    pub id: Option<String>,
    pub address: String,
    /// 对外公布的地址，为空时使用 `address`
    #[serde(default)]
    pub advertise_address: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_ttl")]
    pub ttl: String,
    #[serde(default)]
    pub skip_registration: bool,
}

fn default_ttl() -> String {
    DEFAULT_TTL.to_string()
}

impl ServiceConfig {
    /// 构建服务注册信息
    pub fn registration(&self) -> ServiceRegistration {
        let id = match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => ServiceRegistration::generate_id(&self.name),
        };

        let mut registration =
            ServiceRegistration::new(&self.name, id, &self.address, self.port)
                .with_tags(self.tags.clone())
                .with_ttl(&self.ttl);
        if let Some(addr) = self.advertise_address.as_deref() {
            registration = registration.with_advertise_addr(addr);
        }
        registration.skip_registration = self.skip_registration;
        registration
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_adapter_uri")]
    pub adapter_uri: String, // consul://host:port
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_adapter_uri() -> String {
    "consul://127.0.0.1:8500".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    2000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            adapter_uri: default_adapter_uri(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_refresh_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default)]
    pub failure_policy: RefreshFailurePolicy,
}

fn default_discovery_refresh_ms() -> u64 {
    5000
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_discovery_refresh_ms(),
            failure_policy: RefreshFailurePolicy::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BeaconError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| BeaconError::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 启动前的基本校验；TTL 与心跳间隔的关系由 `HeartbeatPulse` 检查
    pub fn validate(&self) -> Result<()> {
        if self.service.name.is_empty() {
            return Err(BeaconError::config("service name cannot be empty"));
        }
        if self.discovery.refresh_interval_ms == 0 {
            return Err(BeaconError::config("discovery refresh interval cannot be 0"));
        }
        if self.registry.heartbeat_interval_ms == 0 {
            return Err(BeaconError::config("heartbeat interval cannot be 0"));
        }
        if !self.service.ttl.trim().is_empty() {
            crate::registry::parse_ttl(&self.service.ttl)?;
        }
        Ok(())
    }
}
