//! 端点发布者抽象
//!
//! 发布者持有某个服务的权威端点集合，并把每次变化广播给所有订阅者。
//! 订阅者以 `SubscriptionId` 标识，而不是依赖通道本身的相等性。

use super::endpoint::EndpointSet;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 订阅通道的发送端，由订阅者持有接收端并持续消费
pub type Subscriber = mpsc::Sender<EndpointSet>;

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// 端点发布者
#[async_trait]
pub trait Publisher: Send + Sync {
    /// 注册订阅者，并在返回前把当前端点集合发送给它
    async fn subscribe(&self, subscriber: Subscriber) -> Result<SubscriptionId>;

    /// 取消订阅；已经在途的发送不保证送达
    async fn unsubscribe(&self, id: SubscriptionId);

    /// 停止发布，之后不再有任何广播
    ///
    /// 只发出停止信号，不等待后台循环退出。
    fn stop(&self);
}

/// 订阅者集合
#[derive(Default)]
pub(crate) struct Subscriptions {
    next_id: u64,
    subscribers: HashMap<SubscriptionId, Subscriber>,
}

impl Subscriptions {
    /// 先投递当前集合，再登记订阅者；接收端已关闭的订阅者不会登记
    pub(crate) async fn subscribe(
        &mut self,
        subscriber: Subscriber,
        current: &EndpointSet,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        if subscriber.send(current.clone()).await.is_ok() {
            self.subscribers.insert(id, subscriber);
        } else {
            debug!(subscription = id.0, "subscriber closed before initial delivery");
        }
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// 广播到所有订阅者，顺带清理接收端已关闭的订阅
    ///
    /// 传入 `shutdown` 时，一旦停止信号到达就放弃剩余的发送。
    pub(crate) async fn broadcast(
        &mut self,
        set: &EndpointSet,
        shutdown: Option<&CancellationToken>,
    ) {
        let mut closed = Vec::new();
        for (id, subscriber) in &self.subscribers {
            let sent = match shutdown {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    sent = subscriber.send(set.clone()) => sent,
                },
                None => subscriber.send(set.clone()).await,
            };
            if sent.is_err() {
                closed.push(*id);
            }
        }

        for id in closed {
            debug!(subscription = id.0, "dropping closed subscription");
            self.subscribers.remove(&id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
