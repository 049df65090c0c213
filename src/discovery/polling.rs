//! 基于注册中心轮询的发布者
//!
//! 单个控制循环串行处理订阅、取消订阅、定时刷新和停止，
//! 因此广播无需加锁也不会与新订阅者的首次投递交错。

use super::endpoint::{Endpoint, EndpointSet, empty_set};
use super::publisher::{Publisher, Subscriber, SubscriptionId, Subscriptions};
use crate::config::DiscoveryConfig;
use crate::error::{BeaconError, Result};
use crate::registry::{RegistryAdapter, ServiceEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 刷新失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
    /// 发布空集合（fail-closed）
    #[default]
    FailClosed,
    /// 保留上一次成功获取的集合
    RetainLastKnown,
}

impl std::str::FromStr for RefreshFailurePolicy {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "failclosed" => Ok(RefreshFailurePolicy::FailClosed),
            "retain_last_known" | "retain" => Ok(RefreshFailurePolicy::RetainLastKnown),
            _ => Err(BeaconError::config(format!(
                "unknown refresh failure policy: {}",
                s
            ))),
        }
    }
}

enum Command {
    Subscribe {
        subscriber: Subscriber,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe(SubscriptionId),
}

/// 轮询注册中心的端点发布者
pub struct PollingPublisher {
    name: String,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl PollingPublisher {
    /// 创建发布者并启动控制循环（需要在 tokio 运行时内调用）
    ///
    /// 控制循环启动后立即刷新一次；这次刷新失败只会得到空集合，不会导致创建失败。
    pub fn new(
        adapter: Arc<dyn RegistryAdapter>,
        name: impl Into<String>,
        interval: Duration,
    ) -> Result<Self> {
        Self::with_policy(adapter, name, interval, RefreshFailurePolicy::default())
    }

    /// 指定刷新失败策略创建发布者
    pub fn with_policy(
        adapter: Arc<dyn RegistryAdapter>,
        name: impl Into<String>,
        interval: Duration,
        policy: RefreshFailurePolicy,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BeaconError::config("service name cannot be empty"));
        }
        if interval.is_zero() {
            return Err(BeaconError::config("refresh interval cannot be 0"));
        }

        let (commands, command_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let worker = PollLoop {
            adapter,
            name: name.clone(),
            interval,
            policy,
            current: empty_set(),
            subscriptions: Subscriptions::default(),
        };
        tokio::spawn(worker.run(command_rx, shutdown.clone()));

        Ok(Self {
            name,
            commands,
            shutdown,
        })
    }

    /// 按发现配置创建发布者
    pub fn from_config(
        adapter: Arc<dyn RegistryAdapter>,
        name: impl Into<String>,
        config: &DiscoveryConfig,
    ) -> Result<Self> {
        Self::with_policy(adapter, name, config.refresh_interval(), config.failure_policy)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[async_trait]
impl Publisher for PollingPublisher {
    async fn subscribe(&self, subscriber: Subscriber) -> Result<SubscriptionId> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { subscriber, reply })
            .map_err(|_| BeaconError::PublisherStopped)?;
        reply_rx.await.map_err(|_| BeaconError::PublisherStopped)
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        let _ = self.commands.send(Command::Unsubscribe(id));
    }

    fn stop(&self) {
        debug!(service = %self.name, "stopping registry publisher");
        self.shutdown.cancel();
    }
}

struct PollLoop {
    adapter: Arc<dyn RegistryAdapter>,
    name: String,
    interval: Duration,
    policy: RefreshFailurePolicy,
    current: EndpointSet,
    subscriptions: Subscriptions,
}

impl PollLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) {
        debug!(service = %self.name, interval = ?self.interval, "registry publisher started");

        self.current = match self.fetch().await {
            Ok(set) => set,
            Err(e) => {
                debug!(service = %self.name, error = %e, "initial refresh failed");
                empty_set()
            }
        };
        debug!(service = %self.name, endpoints = ?self.current, "found endpoints");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(Command::Subscribe { subscriber, reply }) => {
                        debug!(service = %self.name, endpoints = ?self.current, "sending endpoints to subscription");
                        let id = self.subscriptions.subscribe(subscriber, &self.current).await;
                        let _ = reply.send(id);
                    }
                    Some(Command::Unsubscribe(id)) => {
                        self.subscriptions.unsubscribe(id);
                    }
                    // 所有句柄都已释放，没有人能再停止它
                    None => break,
                },
                _ = ticker.tick() => {
                    debug!(service = %self.name, "discovery check ticked");
                    let result = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        result = self.fetch() => result,
                    };
                    self.current = self.next_set(result);

                    debug!(
                        service = %self.name,
                        endpoints = ?self.current,
                        subscribers = self.subscriptions.len(),
                        "broadcasting endpoints"
                    );
                    self.subscriptions.broadcast(&self.current, Some(&shutdown)).await;
                }
            }
        }

        debug!(service = %self.name, "registry publisher stopped");
    }

    async fn fetch(&self) -> Result<EndpointSet> {
        self.adapter.ping().await?;
        let entries = self.adapter.check_service(&self.name, "", true).await?;
        Ok(format_entries(&entries))
    }

    fn next_set(&self, result: Result<EndpointSet>) -> EndpointSet {
        match result {
            Ok(set) => set,
            Err(e) => match self.policy {
                RefreshFailurePolicy::FailClosed => {
                    warn!(service = %self.name, error = %e, "Failed to refresh endpoints, publishing empty set");
                    empty_set()
                }
                RefreshFailurePolicy::RetainLastKnown => {
                    warn!(service = %self.name, error = %e, "Failed to refresh endpoints, keeping last known set");
                    self.current.clone()
                }
            },
        }
    }
}

/// 把健康检查条目转换为 `http://address:port` 端点
pub fn format_entries(entries: &[ServiceEntry]) -> EndpointSet {
    entries
        .iter()
        .map(|entry| Endpoint::http(entry.address(), entry.service.port))
        .collect()
}
