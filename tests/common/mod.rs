//! 测试公共工具：可编程的注册中心适配器、注册信息样例和轮询断言
#![allow(dead_code)]

use async_trait::async_trait;
use beacon::discovery::{Publisher, StaticPublisher, Subscriber, SubscriptionId};
use beacon::error::{BeaconError, ErrorCode, Result};
use beacon::registry::{
    AdapterStatus, AgentService, CatalogService, Node, RegistryAdapter, ServiceEntry,
    ServiceRegistration, StatusCell,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use wiremock::MockServer;

/// 测试用服务名
pub const TEST_SERVICE: &str = "testservice";

/// 测试用注册信息（TTL 15s）
pub fn test_registration() -> ServiceRegistration {
    ServiceRegistration::new(TEST_SERVICE, "testservice-1", "127.0.0.1", 20000).with_ttl("15s")
}

/// 健康检查条目，服务地址为空时使用节点地址
pub fn service_entry(address: &str, port: u16) -> ServiceEntry {
    ServiceEntry {
        node: Node {
            id: "node-1".to_string(),
            node: "node-1".to_string(),
            address: "10.0.0.1".to_string(),
        },
        service: AgentService {
            id: format!("{}-{}:{}", TEST_SERVICE, address, port),
            service: TEST_SERVICE.to_string(),
            address: address.to_string(),
            port,
            tags: Vec::new(),
        },
        checks: Vec::new(),
    }
}

fn backend_error(reason: &str) -> BeaconError {
    BeaconError::registry(ErrorCode::RegistryUnavailable, reason)
}

/// 可编程的注册中心适配器
///
/// `ping` 不会改变连接状态，状态只由 `set_status` 控制。
pub struct FakeRegistryAdapter {
    status: StatusCell,
    entries: Mutex<Vec<ServiceEntry>>,
    ping_error: Mutex<Option<String>>,
    check_error: Mutex<Option<String>>,
    sync_error: Mutex<Option<String>>,
    register_error: Mutex<Option<String>>,
    check_gate: Mutex<Option<Arc<Semaphore>>>,
    pub pings: AtomicUsize,
    pub syncs: AtomicUsize,
    pub registers: AtomicUsize,
    pub deregisters: AtomicUsize,
    pub checks: AtomicUsize,
}

impl FakeRegistryAdapter {
    pub fn new() -> Self {
        Self {
            status: StatusCell::new(),
            entries: Mutex::new(Vec::new()),
            ping_error: Mutex::new(None),
            check_error: Mutex::new(None),
            sync_error: Mutex::new(None),
            register_error: Mutex::new(None),
            check_gate: Mutex::new(None),
            pings: AtomicUsize::new(0),
            syncs: AtomicUsize::new(0),
            registers: AtomicUsize::new(0),
            deregisters: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn connected() -> Self {
        let adapter = Self::new();
        adapter.set_status(AdapterStatus::Connected);
        adapter
    }

    pub fn with_entries(entries: Vec<ServiceEntry>) -> Self {
        let adapter = Self::connected();
        adapter.set_entries(entries);
        adapter
    }

    pub fn set_status(&self, status: AdapterStatus) {
        self.status.set(status);
    }

    pub fn set_entries(&self, entries: Vec<ServiceEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn fail_ping(&self, reason: Option<&str>) {
        *self.ping_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fail_check(&self, reason: Option<&str>) {
        *self.check_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fail_sync(&self, reason: Option<&str>) {
        *self.sync_error.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn fail_register(&self, reason: Option<&str>) {
        *self.register_error.lock().unwrap() = reason.map(str::to_string);
    }

    /// 之后的 `check_service` 在返回前等待闸门放行，每个许可放行一次
    pub fn hold_checks(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.check_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryAdapter for FakeRegistryAdapter {
    async fn register(&self, _registration: &ServiceRegistration) -> Result<()> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        match self.register_error.lock().unwrap().as_deref() {
            Some(reason) => Err(backend_error(reason)),
            None => Ok(()),
        }
    }

    async fn deregister(&self, _registration: &ServiceRegistration) -> Result<()> {
        self.deregisters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sync(&self, _registration: &ServiceRegistration) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        match self.sync_error.lock().unwrap().as_deref() {
            Some(reason) => Err(backend_error(reason)),
            None => Ok(()),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        match self.ping_error.lock().unwrap().as_deref() {
            Some(reason) => Err(backend_error(reason)),
            None => Ok(()),
        }
    }

    fn status(&self) -> AdapterStatus {
        self.status.get()
    }

    fn adapter_type(&self) -> &str {
        "fake"
    }

    async fn find_service(&self, name: &str, _tag: &str) -> Result<Vec<CatalogService>> {
        let entries = self.entries.lock().unwrap().clone();
        if entries.is_empty() {
            return Err(BeaconError::registry(
                ErrorCode::ServiceNotFound,
                format!("service {} not found", name),
            ));
        }
        Ok(entries
            .iter()
            .map(|e| CatalogService {
                service_id: e.service.id.clone(),
                service_name: e.service.service.clone(),
                service_address: e.service.address.clone(),
                service_port: e.service.port,
                ..Default::default()
            })
            .collect())
    }

    async fn find_services(&self) -> Result<HashMap<String, Vec<String>>> {
        Ok(HashMap::from([(TEST_SERVICE.to_string(), Vec::new())]))
    }

    async fn check_service(
        &self,
        _name: &str,
        _tag: &str,
        _passing_only: bool,
    ) -> Result<Vec<ServiceEntry>> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let gate = self.check_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("check gate closed").forget();
        }
        if let Some(reason) = self.check_error.lock().unwrap().as_deref() {
            return Err(backend_error(reason));
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}

/// 记录取消订阅与停止次数的发布者
pub struct RecordingPublisher {
    pub inner: StaticPublisher,
    pub unsubscribes: AtomicUsize,
    pub stops: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new(inner: StaticPublisher) -> Self {
        Self {
            inner,
            unsubscribes: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn subscribe(&self, subscriber: Subscriber) -> Result<SubscriptionId> {
        self.inner.subscribe(subscriber).await
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.inner.unsubscribe(id).await;
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }
}

/// 反复检查条件直到成立，最多约 2 秒
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// 模拟服务器收到的、路径完全匹配的请求
pub async fn received_at(server: &MockServer, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .expect("request recording is disabled")
        .into_iter()
        .filter(|request| request.url.path() == path)
        .collect()
}
