//! # otpauth
//!
//! 基于邮箱一次性验证码的无密码认证核心库。
//!
//! ## 功能特性
//!
//! - **OTP 生成与校验**: 6 位数字验证码，60 秒过期，最多 3 次尝试
//! - **原子状态转换**: 每次校验在存储内完成 "检查-计次-比较"
//! - **领域事件**: 生成、校验成功/失败、登出均产生带时间戳的事件
//! - **Session 管理**: 校验成功后建立 Session，登出时报告持续时间
//! - **可注入时钟**: 过期判断与事件时间戳都来自注入的 [`clock::Clock`]
//! - **安全随机数**: 密码学安全的随机数与常量时间比较
//!
//! ## 快速开始
//!
//! ```rust
//! use otpauth::passwordless::{OtpConfig, OtpManager, ValidationOutcome};
//!
//! let manager = OtpManager::new(OtpConfig::default());
//!
//! // 生成验证码
//! let code = manager.generate("user@example.com").unwrap();
//! assert_eq!(code.len(), 6);
//!
//! // 校验验证码
//! let outcome = manager.validate("user@example.com", &code).unwrap();
//! assert_eq!(outcome, ValidationOutcome::Success { attempts: 1 });
//! ```
//!
//! ## 完整登录流程
//!
//! ```rust
//! use otpauth::audit::InMemoryEventSink;
//! use otpauth::passwordless::{OtpConfig, OtpLogin, OtpManager};
//! use otpauth::session::SessionManager;
//! use std::sync::Arc;
//!
//! let events = InMemoryEventSink::new();
//! let otp = OtpManager::new(OtpConfig::default()).with_event_sink(Arc::new(events.clone()));
//! let sessions = SessionManager::new().with_event_sink(Arc::new(events.clone()));
//! let login = OtpLogin::new(Arc::new(otp), Arc::new(sessions));
//!
//! let issued = login.request_code("user@example.com").unwrap();
//! let attempt = login.submit(&issued.email, &issued.code).unwrap();
//! assert!(attempt.session.is_some());
//!
//! login.logout().unwrap();
//! assert_eq!(events.len(), 3);
//! ```

pub mod audit;
pub mod clock;
pub mod error;
pub mod passwordless;
pub mod random;
pub mod session;
pub mod validation;

pub use error::{Error, Result};

// ============================================================================
// OTP 相关导出
// ============================================================================

pub use passwordless::{
    CodeDelivery, InAppDelivery, InMemoryOtpStore, OtpConfig, OtpFailure, OtpLogin, OtpManager,
    OtpRecord, OtpStore, ValidationOutcome, ValidationResult,
};

// ============================================================================
// 事件与时钟导出
// ============================================================================

pub use audit::{DomainEvent, EventKind, EventSink, InMemoryEventSink};
pub use clock::{Clock, MockClock, SystemClock};

// ============================================================================
// Session 导出
// ============================================================================

pub use session::{AuthSession, SessionManager};
