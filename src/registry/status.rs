//! 注册中心连接状态

use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// 注册中心连接状态，只由 `ping` 的结果驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum AdapterStatus {
    #[default]
    Disconnected = 0,
    Connected = 1,
}

impl AdapterStatus {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterStatus::Disconnected => "disconnected",
            AdapterStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 互斥锁保护的连接状态
#[derive(Debug, Default)]
pub struct StatusCell {
    status: Mutex<AdapterStatus>,
}

impl StatusCell {
    /// 初始状态为 Disconnected
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AdapterStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn disconnected(&self) -> bool {
        self.get() == AdapterStatus::Disconnected
    }

    /// 设置状态，返回状态是否发生变化
    pub fn set(&self, status: AdapterStatus) -> bool {
        let mut current = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == status {
            return false;
        }
        debug!(from = %*current, to = %status, "registry adapter status changed");
        *current = status;
        true
    }

    /// 根据一次 ping 的结果更新状态：成功 → Connected，失败 → Disconnected
    pub fn record_ping<T, E>(&self, result: &std::result::Result<T, E>) {
        let status = if result.is_ok() {
            AdapterStatus::Connected
        } else {
            AdapterStatus::Disconnected
        };
        self.set(status);
    }
}
