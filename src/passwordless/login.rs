//! 邮箱 + 验证码登录流程
//!
//! 把 [`OtpManager`] 和 [`SessionManager`] 串成完整流程：
//! 规范化邮箱 → 生成并投递验证码 → 校验用户输入 → 建立 Session → 清除验证码。
//!
//! ```rust
//! use otpauth::passwordless::{OtpConfig, OtpLogin, OtpManager};
//! use otpauth::session::SessionManager;
//! use std::sync::Arc;
//!
//! let login = OtpLogin::new(
//!     Arc::new(OtpManager::new(OtpConfig::default())),
//!     Arc::new(SessionManager::new()),
//! );
//!
//! let issued = login.request_code("  User@Example.com ").unwrap();
//! assert_eq!(issued.email, "user@example.com");
//!
//! let attempt = login.submit(&issued.email, &issued.code).unwrap();
//! assert!(attempt.outcome.is_success());
//! assert!(attempt.session.is_some());
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::otp::{OtpManager, ValidationOutcome};
use super::store::{InMemoryOtpStore, OtpStore};
use crate::error::{Result, ValidationError};
use crate::session::{AuthSession, SessionManager};
use crate::validation::{is_valid_code, sanitize_email, validate_email};

/// 已签发的验证码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    /// 规范化后的邮箱
    pub email: String,
    /// 明文验证码（演示用途，真实系统只通过投递通道发送）
    pub code: String,
    /// 过期时间
    pub expires_at: DateTime<Utc>,
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    /// 校验结果
    pub outcome: ValidationOutcome,
    /// 剩余尝试次数
    pub remaining_attempts: u32,
    /// 成功时建立的 Session
    pub session: Option<AuthSession>,
}

/// 登录流程
pub struct OtpLogin<S: OtpStore = InMemoryOtpStore> {
    otp: Arc<OtpManager<S>>,
    sessions: Arc<SessionManager>,
}

impl<S: OtpStore> OtpLogin<S> {
    /// 创建登录流程
    pub fn new(otp: Arc<OtpManager<S>>, sessions: Arc<SessionManager>) -> Self {
        Self { otp, sessions }
    }

    /// 为邮箱请求验证码
    ///
    /// # Arguments
    ///
    /// * `raw_email` - 用户输入的邮箱，会先去除首尾空白并转为小写
    ///
    /// # Returns
    ///
    /// 返回规范化后的邮箱、验证码和过期时间
    ///
    /// # Errors
    ///
    /// - 邮箱为空或格式错误
    /// - 存储或投递失败
    pub fn request_code(&self, raw_email: &str) -> Result<IssuedCode> {
        let email = validate_email(raw_email)?;
        let record = self.otp.issue(&email)?;
        Ok(IssuedCode {
            email,
            code: record.code,
            expires_at: record.expires_at,
        })
    }

    /// 重新发送验证码，旧验证码作废、次数重置
    pub fn resend(&self, email: &str) -> Result<IssuedCode> {
        self.request_code(email)
    }

    /// 提交验证码
    ///
    /// 邮箱按 [`OtpLogin::request_code`] 相同的方式规范化。
    /// 格式不正确的输入直接拒绝，不消耗尝试次数。
    /// 校验成功后建立 Session 并清除验证码记录。
    ///
    /// # Arguments
    ///
    /// * `email` - 请求验证码时使用的邮箱
    /// * `candidate` - 用户输入的验证码，首尾空白会被忽略
    ///
    /// # Returns
    ///
    /// 返回校验结果、剩余尝试次数，以及成功时建立的 Session
    ///
    /// # Errors
    ///
    /// - 验证码不是恰好 `code_length` 位数字
    /// - 存储失败
    pub fn submit(&self, email: &str, candidate: &str) -> Result<LoginAttempt> {
        let email = sanitize_email(email);
        let expected = self.otp.config().code_length;
        let candidate = candidate.trim();
        if !is_valid_code(candidate, expected) {
            return Err(ValidationError::InvalidCode { expected }.into());
        }

        let outcome = self.otp.validate(&email, candidate)?;
        let remaining_attempts = self.otp.remaining_attempts(&email)?;

        let session = if outcome.is_success() {
            let session = self.sessions.login_verified(email.as_str(), &outcome)?;
            self.otp.clear(&email)?;
            Some(session)
        } else {
            None
        };

        Ok(LoginAttempt {
            outcome,
            remaining_attempts,
            session,
        })
    }

    /// 登出当前 Session
    pub fn logout(&self) -> Result<Option<chrono::Duration>> {
        self.sessions.logout()
    }

    /// 当前 Session
    pub fn session(&self) -> Option<AuthSession> {
        self.sessions.current()
    }

    /// OTP 管理器
    pub fn otp(&self) -> &OtpManager<S> {
        &self.otp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::audit::InMemoryEventSink;
    use crate::clock::{Clock, MockClock};
    use crate::passwordless::{OtpConfig, OtpFailure};
    use chrono::Duration;

    fn setup() -> (OtpLogin, MockClock, InMemoryEventSink) {
        let clock = MockClock::new();
        let events = InMemoryEventSink::new();
        let otp = OtpManager::new(OtpConfig::default())
            .with_clock(Arc::new(clock.clone()))
            .with_event_sink(Arc::new(events.clone()));
        let sessions = SessionManager::new()
            .with_clock(Arc::new(clock.clone()))
            .with_event_sink(Arc::new(events.clone()));
        (
            OtpLogin::new(Arc::new(otp), Arc::new(sessions)),
            clock,
            events,
        )
    }

    #[test]
    fn test_request_code_sanitizes_email() {
        let (login, clock, _) = setup();
        let issued = login.request_code(" Alice@Example.COM").unwrap();
        assert_eq!(issued.email, "alice@example.com");
        assert_eq!(issued.expires_at, clock.now() + Duration::seconds(60));
        assert!(login.otp().get_data("alice@example.com").unwrap().is_some());
    }

    #[test]
    fn test_request_code_rejects_invalid_email() {
        let (login, _, events) = setup();
        assert!(matches!(
            login.request_code("not-an-email"),
            Err(Error::Validation(ValidationError::InvalidEmail(_)))
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_submit_normalizes_email() {
        let (login, _, events) = setup();
        let issued = login.request_code(" User@Example.com").unwrap();

        let attempt = login.submit(" User@Example.com", &issued.code).unwrap();
        assert!(attempt.outcome.is_success());
        assert_eq!(attempt.session.unwrap().email, "user@example.com");
        assert!(events.events_for_email(" User@Example.com").is_empty());
    }

    #[test]
    fn test_malformed_code_does_not_consume_attempt() {
        let (login, _, _) = setup();
        let issued = login.request_code("a@b.co").unwrap();

        assert!(matches!(
            login.submit(&issued.email, "12ab"),
            Err(Error::Validation(ValidationError::InvalidCode { expected: 6 }))
        ));
        assert_eq!(login.otp().remaining_attempts(&issued.email).unwrap(), 3);
    }

    #[test]
    fn test_successful_submit_logs_in_and_clears() {
        let (login, _, _) = setup();
        let issued = login.request_code("a@b.co").unwrap();

        let attempt = login.submit(&issued.email, &issued.code).unwrap();
        assert_eq!(attempt.outcome, ValidationOutcome::Success { attempts: 1 });
        assert_eq!(attempt.session.as_ref().unwrap().email, "a@b.co");
        assert_eq!(login.session(), attempt.session);
        assert!(login.otp().get_data("a@b.co").unwrap().is_none());
    }

    #[test]
    fn test_incorrect_submit_reports_remaining() {
        let (login, _, _) = setup();
        let issued = login.request_code("a@b.co").unwrap();
        let wrong = if issued.code == "999999" { "100000" } else { "999999" };

        let attempt = login.submit(&issued.email, wrong).unwrap();
        assert_eq!(attempt.outcome.failure(), Some(OtpFailure::Incorrect));
        assert_eq!(attempt.remaining_attempts, 2);
        assert!(attempt.session.is_none());
        assert!(login.session().is_none());
    }

    #[test]
    fn test_resend_resets_attempts() {
        let (login, _, _) = setup();
        let issued = login.request_code("a@b.co").unwrap();
        let wrong = if issued.code == "999999" { "100000" } else { "999999" };
        for _ in 0..3 {
            login.submit(&issued.email, wrong).unwrap();
        }
        assert_eq!(
            login.submit(&issued.email, &issued.code).unwrap().outcome.failure(),
            Some(OtpFailure::MaxAttempts)
        );

        let fresh = login.resend(&issued.email).unwrap();
        assert_eq!(login.otp().remaining_attempts(&fresh.email).unwrap(), 3);
        assert!(login.submit(&fresh.email, &fresh.code).unwrap().outcome.is_success());
    }

    #[test]
    fn test_logout_after_login() {
        let (login, clock, events) = setup();
        let issued = login.request_code("a@b.co").unwrap();
        login.submit(&issued.email, &issued.code).unwrap();

        clock.advance(Duration::seconds(125));
        assert_eq!(login.logout().unwrap(), Some(Duration::seconds(125)));
        assert_eq!(events.last().unwrap().name, "user_logout");
    }
}
