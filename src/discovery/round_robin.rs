//! 轮询负载均衡

use super::cache::EndpointCache;
use super::endpoint::Endpoint;
use super::load_balancer::LoadBalancer;
use super::publisher::Publisher;
use crate::error::{BeaconError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 轮询负载均衡器
///
/// 游标由所有调用方共享，每次成功的 CAS 独占一个递增的下标，
/// 端点取 `snapshot[old % len]`。每次调用都重新读取缓存快照。
pub struct RoundRobin {
    cache: EndpointCache,
    cursor: AtomicU64,
}

impl RoundRobin {
    pub fn new(cache: EndpointCache) -> Self {
        Self {
            cache,
            cursor: AtomicU64::new(0),
        }
    }

    /// 已经发出的下标数量
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    fn advance(&self) -> u64 {
        let mut old = self.cursor.load(Ordering::Relaxed);
        loop {
            match self.cursor.compare_exchange_weak(
                old,
                old.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return old,
                Err(actual) => old = actual,
            }
        }
    }
}

#[async_trait]
impl LoadBalancer for RoundRobin {
    async fn count(&self) -> usize {
        self.cache.count().await.unwrap_or(0)
    }

    async fn get(&self) -> Result<Endpoint> {
        let snapshot = self.cache.get().await?;
        if snapshot.is_empty() {
            return Err(BeaconError::NoEndpointsAvailable);
        }

        let index = self.advance() % snapshot.len() as u64;
        Ok(snapshot[index as usize].clone())
    }

    fn stop(&self) {
        self.cache.stop();
    }
}

/// 订阅发布者并创建轮询负载均衡器
pub async fn round_robin(publisher: Arc<dyn Publisher>) -> Result<Arc<dyn LoadBalancer>> {
    let cache = EndpointCache::new(publisher).await?;
    Ok(Arc::new(RoundRobin::new(cache)))
}
