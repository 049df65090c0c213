//! 注册中心数据类型
//!
//! 包括服务注册信息，以及注册中心目录 / 健康检查接口返回的条目。
//! 目录类型的字段名沿用 Consul HTTP API 的 PascalCase 命名。

use crate::error::{BeaconError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// 未指定 TTL 时使用的默认值
pub const DEFAULT_TTL: &str = "5s";

/// 服务注册信息
///
/// 标识一个注册到注册中心的运行实例。
/// `name`、`address`、`port`、`id` 必须全部非空（非零）才视为有效。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub name: String,
    pub id: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Go 风格的时长字符串，例如 "5s"、"15s"、"1m 30s"
    #[serde(default)]
    pub ttl: String,
    /// 对外公布的地址，为空时使用 `address`
    #[serde(default)]
    pub advertise_addr: String,
    #[serde(default)]
    pub registry_nodes: Vec<String>,
    #[serde(default)]
    pub skip_registration: bool,
}

impl ServiceRegistration {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    /// 生成 "<name>-<uuid>" 形式的实例 ID
    pub fn generate_id(name: &str) -> String {
        format!("{}-{}", name, uuid::Uuid::new_v4())
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }

    pub fn with_advertise_addr(mut self, addr: impl Into<String>) -> Self {
        self.advertise_addr = addr.into();
        self
    }

    /// 注册信息是否有效
    pub fn valid(&self) -> bool {
        !self.name.is_empty() && !self.address.is_empty() && self.port != 0 && !self.id.is_empty()
    }

    /// 实际生效的 TTL 字符串（为空时取默认值）
    pub fn effective_ttl(&self) -> &str {
        if self.ttl.trim().is_empty() {
            DEFAULT_TTL
        } else {
            self.ttl.trim()
        }
    }

    /// 解析 TTL
    pub fn ttl_duration(&self) -> Result<Duration> {
        parse_ttl(self.effective_ttl())
    }

    /// 对外公布的地址
    pub fn advertise_address(&self) -> &str {
        if self.advertise_addr.is_empty() {
            &self.address
        } else {
            &self.advertise_addr
        }
    }
}

impl fmt::Display for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {} address: {} port: {}",
            self.name, self.address, self.port
        )
    }
}

/// 解析 TTL 字符串，拒绝 0
pub fn parse_ttl(ttl: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(ttl).map_err(|e| BeaconError::InvalidTtl {
        ttl: ttl.to_string(),
        reason: e.to_string(),
    })?;
    if duration.is_zero() {
        return Err(BeaconError::InvalidTtl {
            ttl: ttl.to_string(),
            reason: "ttl cannot be 0".to_string(),
        });
    }
    Ok(duration)
}

/// Consul 在列表字段为空时会返回 `null`
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 目录中的服务条目（`/v1/catalog/service/:name`）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogService {
    #[serde(rename = "ID")]
    pub id: String,
    pub node: String,
    pub address: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    pub service_name: String,
    pub service_address: String,
    pub service_port: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub service_tags: Vec<String>,
}

/// 节点信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: String,
    pub node: String,
    pub address: String,
}

/// 节点上注册的服务
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    pub address: String,
    pub port: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

/// 健康检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthCheck {
    pub node: String,
    #[serde(rename = "CheckID")]
    pub check_id: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
}

/// 健康检查接口返回的服务条目（`/v1/health/service/:name`）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceEntry {
    pub node: Node,
    pub service: AgentService,
    #[serde(deserialize_with = "null_as_default")]
    pub checks: Vec<HealthCheck>,
}

impl ServiceEntry {
    /// 服务地址，服务未单独声明地址时回退到节点地址
    pub fn address(&self) -> &str {
        if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        }
    }
}
