//! Session 管理模块
//!
//! OTP 校验成功后建立认证 Session，直到显式登出。
//! 本模块采用单用户模型：任意时刻最多一个活跃 Session，新的登录会替换旧的。
//!
//! ## 示例
//!
//! ```rust
//! use otpauth::session::SessionManager;
//!
//! let manager = SessionManager::new();
//!
//! let session = manager.login("user@example.com").unwrap();
//! assert!(manager.is_authenticated());
//! println!("Session ID: {}", session.id);
//!
//! let duration = manager.logout().unwrap();
//! assert!(duration.is_some());
//! assert!(!manager.is_authenticated());
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::audit::{DomainEvent, EventSink, NoOpEventSink};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result, SessionError};
use crate::passwordless::ValidationOutcome;
use crate::random::generate_session_token;

/// 认证 Session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Session ID
    pub id: String,

    /// 登录邮箱
    pub email: String,

    /// 开始时间
    pub session_start_time: DateTime<Utc>,
}

impl AuthSession {
    /// 截至 `now` 的持续时间，按整秒截断
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let secs = (now - self.session_start_time).num_seconds().max(0);
        Duration::seconds(secs)
    }
}

/// Session 管理器
pub struct SessionManager {
    current: RwLock<Option<AuthSession>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// 使用系统时钟、不记录事件的管理器
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            clock: Arc::new(SystemClock),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// 设置时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 设置事件日志
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// 为邮箱建立 Session
    ///
    /// 单用户模型：已有的 Session 会被新 Session 替换。
    ///
    /// # Arguments
    ///
    /// * `email` - 已验证的邮箱
    ///
    /// # Returns
    ///
    /// 返回新建的 [`AuthSession`]，`session_start_time` 取自注入的时钟
    ///
    /// # Errors
    ///
    /// - 生成 Session ID 失败
    /// - 内部锁中毒
    ///
    /// # Example
    ///
    /// ```rust
    /// use otpauth::session::SessionManager;
    ///
    /// let manager = SessionManager::new();
    /// let first = manager.login("a@example.com").unwrap();
    /// let second = manager.login("b@example.com").unwrap();
    ///
    /// assert_ne!(first.id, second.id);
    /// assert_eq!(manager.current().unwrap().email, "b@example.com");
    /// ```
    pub fn login(&self, email: impl Into<String>) -> Result<AuthSession> {
        let session = AuthSession {
            id: generate_session_token()?,
            email: email.into(),
            session_start_time: self.clock.now(),
        };

        let mut current = self.current.write().map_err(|_| Error::lock_poisoned())?;
        if let Some(previous) = current.replace(session.clone()) {
            tracing::debug!(email = %previous.email, "replacing active session");
        }
        tracing::info!(email = %session.email, "session started");
        Ok(session)
    }

    /// 仅在校验成功时建立 Session
    ///
    /// # Errors
    ///
    /// - `outcome` 不是成功时返回 [`SessionError::NotVerified`]
    pub fn login_verified(
        &self,
        email: impl Into<String>,
        outcome: &ValidationOutcome,
    ) -> Result<AuthSession> {
        let email = email.into();
        if !outcome.is_success() {
            return Err(SessionError::NotVerified(email).into());
        }
        self.login(email)
    }

    /// 当前 Session
    pub fn current(&self) -> Option<AuthSession> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 是否已认证
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// 当前 Session 已持续的时间
    pub fn elapsed(&self) -> Option<Duration> {
        self.current().map(|s| s.elapsed_at(self.clock.now()))
    }

    /// 登出
    ///
    /// 记录 `user_logout` 事件并丢弃 Session，返回 Session 持续时间。
    /// 没有活跃 Session 时返回 `None`，不记录事件。
    pub fn logout(&self) -> Result<Option<Duration>> {
        let session = {
            let mut current = self.current.write().map_err(|_| Error::lock_poisoned())?;
            current.take()
        };
        let Some(session) = session else {
            return Ok(None);
        };

        let now = self.clock.now();
        let duration = session.elapsed_at(now);
        self.events.log(DomainEvent::user_logout(
            &session.email,
            duration.num_seconds(),
            now,
        ));
        tracing::info!(
            email = %session.email,
            session_duration = duration.num_seconds(),
            "session ended"
        );
        Ok(Some(duration))
    }
}
