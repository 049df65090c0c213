//! 负载均衡器抽象

use super::endpoint::Endpoint;
use crate::error::Result;
use async_trait::async_trait;

/// 负载均衡器
#[async_trait]
pub trait LoadBalancer: Send + Sync {
    /// 当前已知的端点数量；缓存已停止时返回 0
    async fn count(&self) -> usize;

    /// 按策略选择下一个端点，没有可用端点时返回 `NoEndpointsAvailable`
    async fn get(&self) -> Result<Endpoint>;

    /// 释放底层缓存与订阅
    fn stop(&self);
}
