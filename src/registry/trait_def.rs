//! 注册中心适配器 Trait 定义

use super::status::AdapterStatus;
use super::types::{CatalogService, ServiceEntry, ServiceRegistration};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// 注册中心适配器
///
/// 实现必须支持多个心跳 / 发布者并发调用。
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// 注册服务
    async fn register(&self, registration: &ServiceRegistration) -> Result<()>;

    /// 注销服务
    async fn deregister(&self, registration: &ServiceRegistration) -> Result<()>;

    /// 心跳：刷新注册的 TTL 检查
    async fn sync(&self, registration: &ServiceRegistration) -> Result<()>;

    /// 探测注册中心连接，并据此更新连接状态
    async fn ping(&self) -> Result<()>;

    /// 当前连接状态
    fn status(&self) -> AdapterStatus;

    /// 是否处于断开状态
    fn disconnected(&self) -> bool {
        self.status() == AdapterStatus::Disconnected
    }

    /// 适配器类型（如 "consul"）
    fn adapter_type(&self) -> &str;

    /// 按名称（及可选标签）查询目录
    async fn find_service(&self, name: &str, tag: &str) -> Result<Vec<CatalogService>>;

    /// 列出所有服务及其标签
    async fn find_services(&self) -> Result<HashMap<String, Vec<String>>>;

    /// 查询服务的健康实例
    async fn check_service(
        &self,
        name: &str,
        tag: &str,
        passing_only: bool,
    ) -> Result<Vec<ServiceEntry>>;
}
