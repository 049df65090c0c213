//! 服务端点定义

use crate::error::{BeaconError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 服务端点（scheme + host + port），构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
}

/// 某个服务当前健康端点的完整集合
///
/// 每次刷新整体替换，从不原地修改，克隆只增加引用计数。
pub type EndpointSet = Arc<[Endpoint]>;

/// 空端点集合
pub fn empty_set() -> EndpointSet {
    Arc::from(Vec::new())
}

impl Endpoint {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// 创建 http 端点
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::new("http", host, port)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`，IPv6 地址加方括号
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// 拼接请求路径，得到完整 URL
    pub fn url(&self, path: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.to_string())
            .map_err(|e| BeaconError::config(format!("invalid endpoint {}: {}", self, e)))?;
        url.set_path(path);
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority())
    }
}

impl FromStr for Endpoint {
    type Err = BeaconError;

    /// 接受 `scheme://host:port` 或 `host:port`（默认 http）
    fn from_str(s: &str) -> Result<Self> {
        let (scheme, rest) = match s.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("http", s),
        };
        let rest = rest.trim_end_matches('/');

        let invalid = || BeaconError::config(format!("invalid endpoint {:?}", s));

        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        if scheme.is_empty() || host.is_empty() || port == 0 {
            return Err(invalid());
        }

        Ok(Self::new(scheme, host, port))
    }
}
