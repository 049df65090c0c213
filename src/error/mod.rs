//! Beacon 错误处理模块
//!
//! 提供统一的错误类型、错误代码分类，以及基础设施错误到业务错误的转换

pub mod beacon_error;
pub mod code;

pub use beacon_error::{BeaconError, Result};
pub use code::ErrorCode;

/// 基础设施层默认使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;

/// 将基础设施错误转换为 `BeaconError`
pub fn map_infra_error<E, S>(error: E, code: ErrorCode, message: S) -> BeaconError
where
    E: std::fmt::Display,
    S: Into<String>,
{
    BeaconError::registry(code, message).with_details(error.to_string())
}

/// `InfraResult` 的辅助扩展，用于快速转换为统一的错误类型
pub trait InfraResultExt<T> {
    fn into_beacon<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>;
}

impl<T> InfraResultExt<T> for InfraResult<T> {
    fn into_beacon<S>(self, code: ErrorCode, message: S) -> Result<T>
    where
        S: Into<String>,
    {
        // `{:#}` 保留 anyhow 的上下文链
        self.map_err(|err| map_infra_error(format!("{:#}", err), code, message))
    }
}
