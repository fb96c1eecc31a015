//! 统一错误类型模块
//!
//! OTP 校验的业务结果（不存在、过期、次数用尽、错误）不属于错误，
//! 它们由 [`crate::passwordless::ValidationOutcome`] 表示。
//! 这里只定义调用方式错误和基础设施错误。

use thiserror::Error as ThisError;

/// otpauth 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// otpauth 库的错误类型
#[derive(Debug, ThisError)]
pub enum Error {
    /// 输入验证错误
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 加密/随机数错误
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session 错误
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// 验证码投递失败
    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl Error {
    /// 创建一个投递错误
    pub fn delivery(msg: impl Into<String>) -> Self {
        Error::Delivery(msg.into())
    }

    /// 锁中毒时的存储错误
    pub(crate) fn lock_poisoned() -> Self {
        Error::Storage(StorageError::OperationFailed("lock poisoned".into()))
    }
}

/// 验证相关错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    /// 无效的邮箱格式
    #[error("invalid email format: {0}")]
    InvalidEmail(String),
    /// 验证码格式无效（长度或字符不符）
    #[error("invalid code format: expected {expected} digits")]
    InvalidCode { expected: usize },
    /// 字段为空
    #[error("field '{0}' cannot be empty")]
    EmptyField(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConfigError {
    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum StorageError {
    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CryptoError {
    /// 随机数生成失败
    #[error("random number generation failed: {0}")]
    RngFailed(String),
}

/// Session 相关错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SessionError {
    /// 未通过 OTP 验证，不能建立 Session
    #[error("email '{0}' has not been verified")]
    NotVerified(String),
}
