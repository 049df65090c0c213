//! 端点缓存
//!
//! 每个消费者一个中介任务：它独占本地端点集合，串行处理发布者推送的更新
//! 与调用方的 `count` / `get` 请求。同一次读取只会看到某一个完整版本的集合。

use super::endpoint::EndpointSet;
use super::publisher::{Publisher, SubscriptionId};
use crate::error::{BeaconError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const REQUEST_BUFFER: usize = 64;

enum Request {
    Count(oneshot::Sender<usize>),
    Get(oneshot::Sender<EndpointSet>),
}

/// 端点缓存
///
/// 构造时阻塞等待发布者的首次投递，因此构造完成后总有可读的集合。
/// `stop()` 或释放句柄后，中介任务取消订阅并停止发布者，之后的读取返回 `CacheStopped`。
pub struct EndpointCache {
    requests: mpsc::Sender<Request>,
    shutdown: CancellationToken,
}

impl EndpointCache {
    pub async fn new(publisher: Arc<dyn Publisher>) -> Result<Self> {
        let (updates_tx, mut updates) = mpsc::channel(1);
        let subscription = publisher.subscribe(updates_tx).await?;

        let Some(current) = updates.recv().await else {
            publisher.unsubscribe(subscription).await;
            return Err(BeaconError::PublisherStopped);
        };

        let (requests, request_rx) = mpsc::channel(REQUEST_BUFFER);
        let shutdown = CancellationToken::new();

        let mediator = Mediator {
            publisher,
            subscription,
            current,
        };
        tokio::spawn(mediator.run(updates, request_rx, shutdown.clone()));

        Ok(Self { requests, shutdown })
    }

    /// 当前端点数量
    pub async fn count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Count(reply)).await?;
        rx.await.map_err(|_| BeaconError::CacheStopped)
    }

    /// 当前端点集合的快照
    pub async fn get(&self) -> Result<EndpointSet> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Get(reply)).await?;
        rx.await.map_err(|_| BeaconError::CacheStopped)
    }

    /// 停止缓存；不等待中介任务退出
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn send(&self, request: Request) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(BeaconError::CacheStopped);
        }
        self.requests
            .send(request)
            .await
            .map_err(|_| BeaconError::CacheStopped)
    }
}

impl Drop for EndpointCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Mediator {
    publisher: Arc<dyn Publisher>,
    subscription: SubscriptionId,
    current: EndpointSet,
}

impl Mediator {
    async fn run(
        mut self,
        mut updates: mpsc::Receiver<EndpointSet>,
        mut requests: mpsc::Receiver<Request>,
        shutdown: CancellationToken,
    ) {
        let mut updates_open = true;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                // 更新优先于读取，保证下一次读取看到最新集合
                update = updates.recv(), if updates_open => match update {
                    Some(set) => {
                        debug!(endpoints = set.len(), "endpoint cache updated");
                        self.current = set;
                    }
                    None => {
                        debug!("publisher closed the subscription");
                        updates_open = false;
                    }
                },
                request = requests.recv() => match request {
                    Some(Request::Count(reply)) => {
                        let _ = reply.send(self.current.len());
                    }
                    Some(Request::Get(reply)) => {
                        let _ = reply.send(self.current.clone());
                    }
                    None => break,
                },
            }
        }

        // 先关闭接收端，正在向本缓存发送的广播会立即失败而不是阻塞
        drop(updates);
        requests.close();
        self.publisher.unsubscribe(self.subscription).await;
        self.publisher.stop();
        debug!(subscription = self.subscription.as_u64(), "endpoint cache stopped");
    }
}
