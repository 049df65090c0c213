//! 心跳脉冲
//!
//! 按固定间隔对注册中心调用 `sync`，保持一个服务注册处于存活状态。
//!
//! 生命周期：构造（未激活）→ `start()`（激活，周期心跳）→ `stop()`（注销，终止）。
//! 停止后的实例不能再次启动，需要重新构造。

use super::trait_def::RegistryAdapter;
use super::types::ServiceRegistration;
use crate::error::{BeaconError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 默认心跳间隔
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// 心跳脉冲
pub struct HeartbeatPulse {
    interval: Duration,
    registration: ServiceRegistration,
    adapter: Arc<dyn RegistryAdapter>,
    active: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
    shutdown: CancellationToken,
}

impl HeartbeatPulse {
    /// 创建心跳脉冲
    ///
    /// 注册信息无效返回 `InvalidServiceRegistration`；
    /// 间隔为 0 或不小于注册 TTL 时返回配置错误。
    pub fn new(
        interval: Duration,
        registration: ServiceRegistration,
        adapter: Arc<dyn RegistryAdapter>,
    ) -> Result<Self> {
        if !registration.valid() {
            return Err(BeaconError::InvalidServiceRegistration);
        }

        if interval.is_zero() {
            return Err(BeaconError::config("heartbeat interval must be greater than zero"));
        }

        let ttl = registration.ttl_duration()?;
        if interval >= ttl {
            return Err(BeaconError::IntervalExceedsTtl {
                interval,
                ttl: registration.effective_ttl().to_string(),
            });
        }

        Ok(Self {
            interval,
            registration,
            adapter,
            active: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle::Idle),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn registration(&self) -> &ServiceRegistration {
        &self.registration
    }

    /// 心跳循环是否在运行（不代表注册中心确认了注册）
    pub fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// 启动心跳循环
    ///
    /// 需要在 tokio 运行时内调用。重复启动或停止后再启动会返回错误。
    pub fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            match *lifecycle {
                Lifecycle::Idle => *lifecycle = Lifecycle::Running,
                Lifecycle::Running => {
                    return Err(BeaconError::config("heartbeat pulse is already running"));
                }
                Lifecycle::Stopped => {
                    return Err(BeaconError::config(
                        "heartbeat pulse has been stopped and cannot be restarted",
                    ));
                }
            }
        }

        info!(service = %self.registration, interval = ?self.interval, "Starting heartbeat");
        self.active.store(true, Ordering::Release);

        tokio::spawn(beat(
            self.interval,
            self.registration.clone(),
            self.adapter.clone(),
            self.shutdown.clone(),
        ));
        Ok(())
    }

    /// 停止心跳并注销服务
    ///
    /// 注销失败只记录日志。本方法不等待心跳任务真正退出：
    /// 取消信号发出后，任务会在下一次调度时结束。
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            *lifecycle = Lifecycle::Stopped;
        }

        info!(service = %self.registration, "Stopping heartbeat");
        self.shutdown.cancel();

        if let Err(e) = self.adapter.deregister(&self.registration).await {
            warn!(service = %self.registration, error = %e, "Failed to deregister service");
        }

        self.active.store(false, Ordering::Release);
    }
}

impl Drop for HeartbeatPulse {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn beat(
    period: Duration,
    registration: ServiceRegistration,
    adapter: Arc<dyn RegistryAdapter>,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(service = %registration.name, "Heartbeat loop stopped");
                break;
            }
            _ = ticker.tick() => beat_once(adapter.as_ref(), &registration).await,
        }
    }
}

/// 单次心跳
///
/// 连接断开时只尝试 `ping`，本轮不做 `sync`；
/// `sync` 失败只记录日志，下一轮自然重试。
pub(crate) async fn beat_once(adapter: &dyn RegistryAdapter, registration: &ServiceRegistration) {
    if adapter.disconnected() {
        debug!(
            adapter = adapter.adapter_type(),
            "registry adapter connection unavailable"
        );
        if let Err(e) = adapter.ping().await {
            debug!(error = %e, "registry ping failed");
        }
        return;
    }

    match adapter.sync(registration).await {
        Ok(()) => debug!(service = %registration.name, "Heartbeat sent"),
        Err(e) => warn!(
            service = %registration.name,
            error = %e,
            "Heartbeat sync failed, retrying on next tick"
        ),
    }
}
