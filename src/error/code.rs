//! 错误代码定义
//!
//! 错误代码按类别分组，每个类别占用1000个代码范围：
//! - 1000-1999: 注册中心连接相关错误
//! - 2000-2999: 服务注册相关错误
//! - 3000-3999: 服务发现 / 负载均衡相关错误
//! - 4000-4999: 请求相关错误
//! - 9000-9999: 配置及通用错误

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 注册中心连接相关错误 (1000-1999)
    // ============================================================
    RegistryUnavailable = 1000,

    // ============================================================
    // 服务注册相关错误 (2000-2999)
    // ============================================================
    InvalidRegistration = 2000,
    RegisterFailed = 2001,
    DeregisterFailed = 2002,
    SyncFailed = 2003,

    // ============================================================
    // 服务发现相关错误 (3000-3999)
    // ============================================================
    ServiceNotFound = 3000,
    NoEndpointsAvailable = 3001,
    PublisherStopped = 3002,
    CacheStopped = 3003,

    // ============================================================
    // 请求相关错误 (4000-4999)
    // ============================================================
    RequestFailed = 4000,

    // ============================================================
    // 配置及通用错误 (9000-9999)
    // ============================================================
    InvalidConfig = 9000,
    InvalidInterval = 9001,
    InvalidTtl = 9002,
}

impl ErrorCode {
    /// 获取错误代码的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RegistryUnavailable => "REGISTRY_UNAVAILABLE",
            ErrorCode::InvalidRegistration => "INVALID_REGISTRATION",
            ErrorCode::RegisterFailed => "REGISTER_FAILED",
            ErrorCode::DeregisterFailed => "DEREGISTER_FAILED",
            ErrorCode::SyncFailed => "SYNC_FAILED",
            ErrorCode::ServiceNotFound => "SERVICE_NOT_FOUND",
            ErrorCode::NoEndpointsAvailable => "NO_ENDPOINTS_AVAILABLE",
            ErrorCode::PublisherStopped => "PUBLISHER_STOPPED",
            ErrorCode::CacheStopped => "CACHE_STOPPED",
            ErrorCode::RequestFailed => "REQUEST_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::InvalidInterval => "INVALID_INTERVAL",
            ErrorCode::InvalidTtl => "INVALID_TTL",
        }
    }

    /// 获取错误代码的数值
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
