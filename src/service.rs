//! 服务生命周期
//!
//! 把一个服务实例注册到注册中心、用心跳保持注册存活，并持有它依赖的下游服务客户端。
//! 停止时注销服务并释放所有客户端的负载均衡器。

use crate::client::ServiceClient;
use crate::config::Config;
use crate::error::{BeaconError, ErrorCode, Result};
use crate::registry::{
    DEFAULT_HEARTBEAT_INTERVAL, HeartbeatPulse, RegistryAdapter, ServiceRegistration,
    create_adapter,
};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

pub struct Service {
    registration: ServiceRegistration,
    adapter: Arc<dyn RegistryAdapter>,
    heartbeat_interval: Duration,
    pulse: Mutex<Option<Arc<HeartbeatPulse>>>,
    clients: RwLock<Vec<Arc<ServiceClient>>>,
}

impl Service {
    pub fn new(registration: ServiceRegistration, adapter: Arc<dyn RegistryAdapter>) -> Self {
        Self {
            registration,
            adapter,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            pulse: Mutex::new(None),
            clients: RwLock::new(Vec::new()),
        }
    }

    /// 根据配置创建注册中心适配器和服务
    pub async fn from_config(config: &Config) -> Result<Self> {
        let adapter = create_adapter(&config.registry).await?;
        Ok(Self::new(config.service.registration(), adapter)
            .with_heartbeat_interval(config.registry.heartbeat_interval()))
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.registration.name
    }

    pub fn registration(&self) -> &ServiceRegistration {
        &self.registration
    }

    pub fn adapter(&self) -> &Arc<dyn RegistryAdapter> {
        &self.adapter
    }

    /// 心跳是否在运行
    pub fn synced(&self) -> bool {
        self.current_pulse().is_some_and(|pulse| pulse.active())
    }

    /// 向注册中心注册服务并准备心跳（尚未启动）
    ///
    /// 注册信息无效或心跳间隔不小于 TTL 时直接返回错误，不会访问注册中心。
    pub async fn register(&self) -> Result<()> {
        if self.adapter.disconnected() {
            return Err(BeaconError::registry(
                ErrorCode::RegistryUnavailable,
                format!("registry adapter {} is not connected", self.adapter.adapter_type()),
            ));
        }

        if self.synced() {
            return Err(BeaconError::registry(
                ErrorCode::RegisterFailed,
                format!("service {} is already registered", self.name()),
            ));
        }

        // 先校验注册信息和心跳间隔，失败时注册中心里不会留下没有心跳的实例
        let pulse = HeartbeatPulse::new(
            self.heartbeat_interval,
            self.registration.clone(),
            self.adapter.clone(),
        )?;

        self.adapter.register(&self.registration).await?;
        info!(service = %self.registration.name, adapter = self.adapter.adapter_type(), "Service registered");

        *self.pulse.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(pulse));
        Ok(())
    }

    /// 注册服务并启动心跳；`skip_registration` 时什么都不做
    pub async fn start(&self) -> Result<()> {
        info!(service = %self.registration.name, "Starting service");

        if self.registration.skip_registration {
            debug!(service = %self.registration.name, "registration skipped");
            return Ok(());
        }

        if let Err(e) = self.register().await {
            info!(service = %self.registration.name, error = %e, "Service is not registered");
            return Err(e);
        }

        match self.current_pulse() {
            Some(pulse) => pulse.start(),
            None => Ok(()),
        }
    }

    /// 停止心跳（注销服务），并停止所有服务客户端
    pub async fn stop(&self) {
        let pulse = self.pulse.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pulse) = pulse {
            pulse.stop().await;
        }

        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        for client in clients.iter() {
            debug!(client = client.service_name(), "stopping load balancer");
            client.stop();
        }
        info!(service = %self.registration.name, "Service stopped");
    }

    /// 添加服务客户端；同名客户端已存在时忽略
    pub fn add_service_client(&self, client: ServiceClient) {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        if clients
            .iter()
            .any(|c| c.service_name() == client.service_name())
        {
            debug!(client = client.service_name(), "service client already exists");
            return;
        }
        clients.push(Arc::new(client));
    }

    pub fn service_client(&self, name: &str) -> Result<Arc<ServiceClient>> {
        debug!(client = name, "finding service client");
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.service_name() == name)
            .cloned()
            .ok_or_else(|| {
                BeaconError::registry(
                    ErrorCode::ServiceNotFound,
                    format!("service client with name: {} does not exist", name),
                )
            })
    }

    pub fn service_clients(&self) -> Vec<Arc<ServiceClient>> {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current_pulse(&self) -> Option<Arc<HeartbeatPulse>> {
        self.pulse
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
