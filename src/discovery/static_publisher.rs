//! 静态端点发布者
//!
//! 持有固定的端点集合，可通过 `replace` 手动替换。没有后台任务。

use super::endpoint::EndpointSet;
use super::publisher::{Publisher, Subscriber, SubscriptionId, Subscriptions};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

struct Inner {
    current: EndpointSet,
    subscriptions: Subscriptions,
}

/// 静态端点发布者
///
/// 订阅、取消订阅与替换都在同一把锁下完成，
/// 替换后的广播与状态更新对其他操作是原子的。
pub struct StaticPublisher {
    inner: Mutex<Inner>,
}

impl StaticPublisher {
    pub fn new(endpoints: impl Into<EndpointSet>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: endpoints.into(),
                subscriptions: Subscriptions::default(),
            }),
        }
    }

    /// 替换端点集合并广播给所有订阅者
    pub async fn replace(&self, endpoints: impl Into<EndpointSet>) {
        let mut inner = self.inner.lock().await;
        inner.current = endpoints.into();
        debug!(
            endpoints = ?inner.current,
            subscribers = inner.subscriptions.len(),
            "replacing static endpoints"
        );

        let Inner {
            current,
            subscriptions,
        } = &mut *inner;
        subscriptions.broadcast(current, None).await;
    }

    /// 当前端点集合
    pub async fn current(&self) -> EndpointSet {
        self.inner.lock().await.current.clone()
    }
}

#[async_trait]
impl Publisher for StaticPublisher {
    async fn subscribe(&self, subscriber: Subscriber) -> Result<SubscriptionId> {
        let mut inner = self.inner.lock().await;
        let Inner {
            current,
            subscriptions,
        } = &mut *inner;
        Ok(subscriptions.subscribe(subscriber, current).await)
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().await.subscriptions.unsubscribe(id);
    }

    fn stop(&self) {}
}
