//! Beacon 统一错误类型

use super::code::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Beacon 统一错误类型
///
/// 构造期的配置错误、`get()` 的选择错误会直接返回给调用方；
/// 轮询和心跳中的注册中心错误只在后台循环内记录，不会传播给订阅者。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeaconError {
    /// 服务注册信息不完整（name / address / port / id 缺失）
    #[error("service registration is invalid")]
    InvalidServiceRegistration,

    /// 心跳间隔不小于注册 TTL
    #[error("pulse interval {interval:?} must be shorter than registration TTL {ttl}")]
    IntervalExceedsTtl { interval: Duration, ttl: String },

    /// TTL 无法解析或为 0
    #[error("invalid registration TTL {ttl:?}: {reason}")]
    InvalidTtl { ttl: String, reason: String },

    /// 其他配置错误
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// 当前没有可用的服务端点
    #[error("no endpoints available")]
    NoEndpointsAvailable,

    /// 发布者已停止
    #[error("publisher has been stopped")]
    PublisherStopped,

    /// 端点缓存已停止
    #[error("endpoint cache has been stopped")]
    CacheStopped,

    /// 注册中心调用失败
    #[error("registry error [{code}] {reason}")]
    Registry {
        code: ErrorCode,
        reason: String,
        details: Option<String>,
    },

    /// 出站 HTTP 请求失败
    #[error("request error: {0}")]
    Request(String),
}

impl BeaconError {
    /// 创建注册中心错误
    pub fn registry(code: ErrorCode, reason: impl Into<String>) -> Self {
        BeaconError::Registry {
            code,
            reason: reason.into(),
            details: None,
        }
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        BeaconError::InvalidConfig(msg.into())
    }

    /// 创建请求错误
    pub fn request(msg: impl Into<String>) -> Self {
        BeaconError::Request(msg.into())
    }

    /// 附加错误详情（仅对注册中心错误生效）
    pub fn with_details(mut self, value: impl Into<String>) -> Self {
        if let BeaconError::Registry { details, .. } = &mut self {
            *details = Some(value.into());
        }
        self
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            BeaconError::InvalidServiceRegistration => ErrorCode::InvalidRegistration,
            BeaconError::IntervalExceedsTtl { .. } => ErrorCode::InvalidInterval,
            BeaconError::InvalidTtl { .. } => ErrorCode::InvalidTtl,
            BeaconError::InvalidConfig(_) => ErrorCode::InvalidConfig,
            BeaconError::NoEndpointsAvailable => ErrorCode::NoEndpointsAvailable,
            BeaconError::PublisherStopped => ErrorCode::PublisherStopped,
            BeaconError::CacheStopped => ErrorCode::CacheStopped,
            BeaconError::Registry { code, .. } => *code,
            BeaconError::Request(_) => ErrorCode::RequestFailed,
        }
    }

    /// 是否为配置错误（构造期快速失败）
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BeaconError::InvalidServiceRegistration
                | BeaconError::IntervalExceedsTtl { .. }
                | BeaconError::InvalidTtl { .. }
                | BeaconError::InvalidConfig(_)
        )
    }
}

impl From<reqwest::Error> for BeaconError {
    fn from(err: reqwest::Error) -> Self {
        BeaconError::Request(err.to_string())
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, BeaconError>;
