//! Consul 注册中心适配器

use super::status::{AdapterStatus, StatusCell};
use super::trait_def::RegistryAdapter;
use super::types::{CatalogService, ServiceEntry, ServiceRegistration};
use crate::error::{BeaconError, ErrorCode, InfraResult, InfraResultExt, Result};
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CONSUL_TYPE: &str = "consul";
pub const DEFAULT_CONSUL_ADDRESS: &str = "127.0.0.1:8500";

/// 单次请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const INDEX_HEADER: &str = "X-Consul-Index";

#[allow(non_snake_case)]
#[derive(Serialize)]
struct AgentServiceRegistration<'a> {
    ID: &'a str,
    Name: &'a str,
    Tags: &'a [String],
    Address: &'a str,
    Port: u16,
    Check: AgentServiceCheck<'a>,
}

#[allow(non_snake_case)]
#[derive(Serialize)]
struct AgentServiceCheck<'a> {
    TTL: &'a str,
}

/// Consul 注册中心适配器
pub struct ConsulAdapter {
    http_client: reqwest::Client,
    base_url: String,
    last_index: AtomicU64,
    status: StatusCell,
}

impl ConsulAdapter {
    /// 创建适配器（不发起网络请求）
    ///
    /// `address` 为 `host:port`，为空时使用本地 agent。
    pub fn new(address: &str) -> Result<Self> {
        let address = if address.is_empty() {
            DEFAULT_CONSUL_ADDRESS
        } else {
            address
        };

        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| BeaconError::config(format!("failed to build consul client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: format!("http://{}", address.trim_end_matches('/')),
            last_index: AtomicU64::new(0),
            status: StatusCell::new(),
        })
    }

    /// 创建适配器并立即探测一次连接
    ///
    /// 探测失败只影响连接状态，不会导致创建失败。
    pub async fn connect(address: &str) -> Result<Self> {
        let adapter = Self::new(address)?;
        if let Err(e) = adapter.ping().await {
            warn!(consul = %adapter.base_url, error = %e, "Consul is not reachable yet");
        }
        Ok(adapter)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 最近一次查询返回的 `X-Consul-Index`
    pub fn last_index(&self) -> u64 {
        self.last_index.load(Ordering::Acquire)
    }

    /// 当前 leader 地址
    pub async fn leader(&self) -> Result<String> {
        let (leader, _) = self
            .get_json::<String>("/v1/status/leader", &[])
            .await
            .into_beacon(ErrorCode::RegistryUnavailable, "failed to query consul leader")?;
        Ok(leader)
    }

    fn check_id(id: &str) -> String {
        format!("service:{}", id)
    }

    fn remember_index(&self, index: Option<u64>) {
        if let Some(index) = index {
            self.last_index.store(index, Ordering::Release);
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> InfraResult<(T, Option<u64>)> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET {} returned {}: {}", path, status, body.trim());
        }

        let index = resp
            .headers()
            .get(INDEX_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let value = resp
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response of GET {}", path))?;

        Ok((value, index))
    }

    async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> InfraResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.put(&url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("PUT {} failed", path))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("PUT {} returned {}: {}", path, status, body.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryAdapter for ConsulAdapter {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        let payload = AgentServiceRegistration {
            ID: &registration.id,
            Name: &registration.name,
            Tags: &registration.tags,
            Address: registration.advertise_address(),
            Port: registration.port,
            Check: AgentServiceCheck {
                TTL: registration.effective_ttl(),
            },
        };

        self.put("/v1/agent/service/register", Some(&payload), &[])
            .await
            .into_beacon(ErrorCode::RegisterFailed, "failed to register service with consul")?;

        info!(service = %registration, "Service registered with Consul");
        Ok(())
    }

    async fn deregister(&self, registration: &ServiceRegistration) -> Result<()> {
        let path = format!("/v1/agent/service/deregister/{}", registration.id);
        self.put::<()>(&path, None, &[])
            .await
            .into_beacon(ErrorCode::DeregisterFailed, "failed to deregister service from consul")?;

        info!(service = %registration, "Service deregistered from Consul");
        Ok(())
    }

    async fn sync(&self, registration: &ServiceRegistration) -> Result<()> {
        let path = format!("/v1/agent/check/pass/{}", Self::check_id(&registration.id));
        self.put::<()>(&path, None, &[("note", "pass")])
            .await
            .into_beacon(ErrorCode::SyncFailed, "failed to pass consul TTL check")
    }

    async fn ping(&self) -> Result<()> {
        let result = self.leader().await;
        self.status.record_ping(&result);
        let leader = result?;

        debug!(leader = %leader, "consul current leader");
        match self.get_json::<Vec<String>>("/v1/status/peers", &[]).await {
            Ok((peers, _)) => debug!(peers = ?peers, "consul current peers"),
            Err(e) => debug!(error = %e, "failed to query consul peers"),
        }
        Ok(())
    }

    fn status(&self) -> AdapterStatus {
        self.status.get()
    }

    fn disconnected(&self) -> bool {
        self.status.disconnected()
    }

    fn adapter_type(&self) -> &str {
        CONSUL_TYPE
    }

    async fn find_service(&self, name: &str, tag: &str) -> Result<Vec<CatalogService>> {
        let path = format!("/v1/catalog/service/{}", name);
        let mut query = vec![("consistent", "")];
        if !tag.is_empty() {
            query.push(("tag", tag));
        }

        let (nodes, index) = self
            .get_json::<Vec<CatalogService>>(&path, &query)
            .await
            .into_beacon(ErrorCode::RegistryUnavailable, "failed to query consul catalog")?;

        if nodes.is_empty() {
            return Err(BeaconError::registry(
                ErrorCode::ServiceNotFound,
                format!("service {} not found", name),
            ));
        }

        self.remember_index(index);
        debug!(service = %name, index = ?index, nodes = nodes.len(), "consul catalog lookup");
        Ok(nodes)
    }

    async fn find_services(&self) -> Result<HashMap<String, Vec<String>>> {
        let (services, index) = self
            .get_json::<HashMap<String, Option<Vec<String>>>>(
                "/v1/catalog/services",
                &[("consistent", "")],
            )
            .await
            .into_beacon(ErrorCode::RegistryUnavailable, "failed to list consul services")?;

        self.remember_index(index);
        debug!(index = ?index, services = services.len(), "consul catalog services");
        Ok(services
            .into_iter()
            .map(|(name, tags)| (name, tags.unwrap_or_default()))
            .collect())
    }

    async fn check_service(
        &self,
        name: &str,
        tag: &str,
        passing_only: bool,
    ) -> Result<Vec<ServiceEntry>> {
        self.find_service(name, "").await?;

        let path = format!("/v1/health/service/{}", name);
        let mut query = vec![("consistent", "")];
        if !tag.is_empty() {
            query.push(("tag", tag));
        }
        if passing_only {
            query.push(("passing", "true"));
        }

        let (entries, index) = self
            .get_json::<Vec<ServiceEntry>>(&path, &query)
            .await
            .into_beacon(ErrorCode::RegistryUnavailable, "failed to query consul health")?;

        self.remember_index(index);
        debug!(service = %name, index = ?index, entries = entries.len(), "consul health lookup");
        Ok(entries)
    }
}
