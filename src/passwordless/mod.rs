//! 无密码认证模块
//!
//! 基于邮箱一次性验证码 (OTP) 的无密码认证。
//!
//! ## 功能特性
//!
//! - **OTP 管理**: 生成 6 位数字验证码，60 秒过期，每个验证码最多校验 3 次
//! - **可插拔存储**: 每个邮箱一条记录，原子的状态转换
//! - **投递通道**: 验证码通过注入的 [`CodeDelivery`] 投递
//! - **登录流程**: 校验成功后建立 Session 并清除验证码
//!
//! ## 设计原则
//!
//! 本模块只负责验证码的生成和校验逻辑，**不包含**实际的邮件/短信发送功能。
//! 发送功能应该由应用层实现 [`CodeDelivery`] 接入第三方服务。
//!
//! ## 示例
//!
//! ```rust
//! use otpauth::passwordless::{OtpManager, OtpConfig, ValidationResult};
//!
//! let manager = OtpManager::new(OtpConfig::default());
//! let code = manager.generate("user@example.com").unwrap();
//!
//! let result: ValidationResult = manager.validate("user@example.com", &code).unwrap().into();
//! assert!(result.success);
//! ```
//!
//! ## 安全考虑
//!
//! - 验证码使用密码学安全的随机数生成
//! - 验证码比较使用常量时间比较，防止时序攻击
//! - 校验的 "检查-计次-比较" 在存储内原子完成

pub mod delivery;
pub mod login;
pub mod otp;
pub mod store;

pub use delivery::{CodeDelivery, InAppDelivery, TracingDelivery};
pub use login::{IssuedCode, LoginAttempt, OtpLogin};
pub use otp::{
    OtpConfig, OtpFailure, OtpManager, OtpRecord, ValidationOutcome, ValidationResult,
};
pub use store::{InMemoryOtpStore, OtpStore};
