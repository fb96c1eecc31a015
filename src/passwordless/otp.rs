//! OTP (One-Time Password) 实现
//!
//! 服务端为每个邮箱生成随机数字验证码，在固定时间窗口内有效，
//! 每个验证码最多允许校验若干次。
//!
//! ## 工作流程
//!
//! 1. 调用方为邮箱请求验证码，旧验证码立即作废
//! 2. 验证码通过 [`CodeDelivery`] 投递，同时返回给调用方（演示用途）
//! 3. 用户提交验证码，按固定顺序检查：是否存在 → 是否过期 → 次数是否用尽 → 是否匹配
//! 4. 校验结果以 [`ValidationOutcome`] 返回，不以错误的形式抛出
//! 5. 每次生成和校验都会向 [`EventSink`] 写入一条领域事件
//!
//! ## 示例
//!
//! ```rust
//! use otpauth::passwordless::{OtpConfig, OtpManager, OtpFailure, ValidationOutcome};
//!
//! let manager = OtpManager::new(OtpConfig::default());
//!
//! let code = manager.generate("user@example.com").unwrap();
//! assert_eq!(code.len(), 6);
//!
//! let outcome = manager.validate("user@example.com", &code).unwrap();
//! assert_eq!(outcome, ValidationOutcome::Success { attempts: 1 });
//!
//! let outcome = manager.validate("missing@example.com", "123456").unwrap();
//! assert_eq!(outcome.failure(), Some(OtpFailure::NoOtp));
//! ```
//!
//! ## 自定义配置
//!
//! ```rust
//! use otpauth::passwordless::OtpConfig;
//! use std::time::Duration;
//!
//! let config = OtpConfig::default()
//!     .with_code_length(8)
//!     .with_ttl(Duration::from_secs(120))
//!     .with_max_attempts(5);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use super::delivery::{CodeDelivery, InAppDelivery};
use super::store::{InMemoryOtpStore, OtpStore};
use crate::audit::{DomainEvent, EventSink, NoOpEventSink};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, Result, ValidationError};
use crate::random::{constant_time_compare_str, generate_numeric_code};

/// 验证码位数的环境变量
pub const ENV_CODE_LENGTH: &str = "OTP_CODE_LENGTH";
/// 有效期（秒）的环境变量
pub const ENV_TTL_SECS: &str = "OTP_TTL_SECS";
/// 最大尝试次数的环境变量
pub const ENV_MAX_ATTEMPTS: &str = "OTP_MAX_ATTEMPTS";

// ============================================================================
// 配置
// ============================================================================

/// OTP 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// 验证码长度（数字位数）
    pub code_length: usize,

    /// 验证码有效期
    pub ttl: std::time::Duration,

    /// 每个验证码允许的最大校验次数
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl: std::time::Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

impl OtpConfig {
    /// 创建新配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置验证码长度
    pub fn with_code_length(mut self, length: usize) -> Self {
        assert!(
            (4..=10).contains(&length),
            "code length must be between 4 and 10"
        );
        self.code_length = length;
        self
    }

    /// 设置有效期
    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 设置最大尝试次数
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// 高安全性配置
    ///
    /// - 8 位验证码
    /// - 1 分钟过期
    /// - 最多 3 次尝试
    pub fn high_security() -> Self {
        Self {
            code_length: 8,
            ttl: std::time::Duration::from_secs(60),
            max_attempts: 3,
        }
    }

    /// 宽松配置（适用于开发/测试）
    ///
    /// - 4 位验证码
    /// - 30 分钟过期
    /// - 10 次尝试
    pub fn relaxed() -> Self {
        Self {
            code_length: 4,
            ttl: std::time::Duration::from_secs(30 * 60),
            max_attempts: 10,
        }
    }

    /// 从环境变量读取配置
    ///
    /// 读取 `OTP_CODE_LENGTH`、`OTP_TTL_SECS`、`OTP_MAX_ATTEMPTS`，
    /// 未设置的项使用默认值。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CODE_LENGTH) {
            let length: usize = parse_value(ENV_CODE_LENGTH, &raw)?;
            if !(4..=10).contains(&length) {
                return Err(invalid_value(ENV_CODE_LENGTH, "must be between 4 and 10").into());
            }
            config.code_length = length;
        }

        if let Some(raw) = lookup(ENV_TTL_SECS) {
            let secs: u64 = parse_value(ENV_TTL_SECS, &raw)?;
            if secs == 0 {
                return Err(invalid_value(ENV_TTL_SECS, "must be greater than 0").into());
            }
            config.ttl = std::time::Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            let max: u32 = parse_value(ENV_MAX_ATTEMPTS, &raw)?;
            if max == 0 {
                return Err(invalid_value(ENV_MAX_ATTEMPTS, "must be greater than 0").into());
            }
            config.max_attempts = max;
        }

        Ok(config)
    }

    /// 有效期（chrono 表示）
    fn ttl_duration(&self) -> Result<Duration> {
        Duration::from_std(self.ttl)
            .map_err(|e| invalid_value("ttl", &e.to_string()).into())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid_value(key, &e.to_string()).into())
}

fn invalid_value(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

// ============================================================================
// 数据结构
// ============================================================================

/// 存储的 OTP 记录
///
/// 记录是不可变值：每次校验产生一条新记录替换旧记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// 验证码
    pub code: String,

    /// 生成时间
    pub issued_at: DateTime<Utc>,

    /// 过期时间
    pub expires_at: DateTime<Utc>,

    /// 已校验次数
    pub attempts: u32,
}

impl OtpRecord {
    /// 创建新记录，`attempts` 为 0
    pub fn new(code: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            code: code.into(),
            issued_at,
            expires_at: issued_at + ttl,
            attempts: 0,
        }
    }

    /// 返回校验次数加一后的新记录
    pub fn with_attempt(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }

    /// 在 `now` 时刻是否已过期（严格晚于过期时间才算过期）
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 剩余尝试次数
    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }

    /// 剩余有效时间（秒，向上取整）
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expires_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + 999) / 1000
        }
    }
}

/// 校验失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpFailure {
    /// 该邮箱没有验证码
    NoOtp,
    /// 验证码已过期
    Expired,
    /// 尝试次数已用尽
    MaxAttempts,
    /// 验证码不匹配
    Incorrect,
}

impl OtpFailure {
    /// 对外的错误码，如 `NO_OTP`
    pub fn code(&self) -> &'static str {
        match self {
            OtpFailure::NoOtp => "NO_OTP",
            OtpFailure::Expired => "EXPIRED",
            OtpFailure::MaxAttempts => "MAX_ATTEMPTS",
            OtpFailure::Incorrect => "INCORRECT",
        }
    }

    /// 事件中使用的原因，如 `no_otp`
    pub fn reason(&self) -> &'static str {
        match self {
            OtpFailure::NoOtp => "no_otp",
            OtpFailure::Expired => "expired",
            OtpFailure::MaxAttempts => "max_attempts",
            OtpFailure::Incorrect => "incorrect",
        }
    }
}

impl std::fmt::Display for OtpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpFailure::NoOtp => write!(f, "no code has been issued for this email"),
            OtpFailure::Expired => write!(f, "code has expired, please request a new one"),
            OtpFailure::MaxAttempts => {
                write!(f, "maximum attempts exceeded, please request a new code")
            }
            OtpFailure::Incorrect => write!(f, "incorrect code"),
        }
    }
}

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// 校验成功，`attempts` 为包含本次在内的已校验次数
    Success { attempts: u32 },
    /// 校验失败
    Failure(OtpFailure),
}

impl ValidationOutcome {
    /// 是否成功
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success { .. })
    }

    /// 失败原因
    pub fn failure(&self) -> Option<OtpFailure> {
        match self {
            ValidationOutcome::Success { .. } => None,
            ValidationOutcome::Failure(failure) => Some(*failure),
        }
    }
}

/// 面向界面的校验结果：`{ "success": bool, "error"?: "NO_OTP" | ... }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OtpFailure>,
}

impl From<ValidationOutcome> for ValidationResult {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            error: outcome.failure(),
        }
    }
}

// ============================================================================
// OTP 管理器
// ============================================================================

/// OTP 管理器
///
/// 负责生成和校验一次性验证码。存储、时钟、事件日志和投递通道都通过构造注入。
///
/// ```rust
/// use otpauth::audit::InMemoryEventSink;
/// use otpauth::clock::MockClock;
/// use otpauth::passwordless::{OtpConfig, OtpFailure, OtpManager};
/// use std::sync::Arc;
///
/// let clock = MockClock::new();
/// let events = InMemoryEventSink::new();
/// let manager = OtpManager::new(OtpConfig::default())
///     .with_clock(Arc::new(clock.clone()))
///     .with_event_sink(Arc::new(events.clone()));
///
/// let code = manager.generate("user@example.com").unwrap();
/// clock.advance(chrono::Duration::seconds(61));
///
/// let outcome = manager.validate("user@example.com", &code).unwrap();
/// assert_eq!(outcome.failure(), Some(OtpFailure::Expired));
/// assert_eq!(events.len(), 2);
/// ```
pub struct OtpManager<S: OtpStore = InMemoryOtpStore> {
    store: S,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    delivery: Arc<dyn CodeDelivery>,
}

impl OtpManager<InMemoryOtpStore> {
    /// 使用默认内存存储创建管理器
    pub fn new(config: OtpConfig) -> Self {
        Self::with_store(InMemoryOtpStore::new(), config)
    }

    /// 使用默认配置创建管理器
    pub fn with_default_config() -> Self {
        Self::new(OtpConfig::default())
    }
}

impl<S: OtpStore> OtpManager<S> {
    /// 使用自定义存储创建管理器
    pub fn with_store(store: S, config: OtpConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            events: Arc::new(NoOpEventSink),
            delivery: Arc::new(InAppDelivery::new()),
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

    /// 设置投递通道
    pub fn with_delivery(mut self, delivery: Arc<dyn CodeDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    /// 为邮箱签发验证码，返回新记录
    ///
    /// 无条件替换该邮箱已有的记录。记录写入与 `otp_generated` 事件在存储的
    /// 同一临界区内完成，随后把验证码交给投递通道。
    ///
    /// # Arguments
    ///
    /// * `email` - 邮箱（调用方负责规范化）
    ///
    /// # Returns
    ///
    /// 返回已写入存储的 [`OtpRecord`]，包含明文验证码和过期时间
    ///
    /// # Errors
    ///
    /// - 邮箱为空
    /// - 存储或投递失败（投递失败时记录已写入，调用方可重新签发）
    pub fn issue(&self, email: &str) -> Result<OtpRecord> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email".into()).into());
        }

        let issued_at = self.clock.now();
        let record = OtpRecord::new(
            generate_numeric_code(self.config.code_length),
            issued_at,
            self.config.ttl_duration()?,
        );

        self.store.update(email, &mut |_| {
            self.events.log(DomainEvent::otp_generated(email, issued_at));
            Some(record.clone())
        })?;
        tracing::info!(email, expires_at = %record.expires_at, "otp generated");

        self.delivery.deliver(email, &record.code)?;
        Ok(record)
    }

    /// 为邮箱生成验证码，返回明文验证码
    ///
    /// 等价于 [`OtpManager::issue`] 只取验证码。
    ///
    /// # Example
    ///
    /// ```rust
    /// use otpauth::passwordless::{OtpConfig, OtpManager};
    ///
    /// let manager = OtpManager::new(OtpConfig::default());
    /// let code = manager.generate("user@example.com").unwrap();
    ///
    /// assert_eq!(code.len(), 6);
    /// assert!(!code.starts_with('0'));
    /// ```
    pub fn generate(&self, email: &str) -> Result<String> {
        self.issue(email).map(|record| record.code)
    }

    /// 校验验证码
    ///
    /// 按以下顺序检查，命中即返回：
    ///
    /// 1. 没有记录 → [`OtpFailure::NoOtp`]
    /// 2. 已过期 → [`OtpFailure::Expired`]（不计次）
    /// 3. 次数已用尽 → [`OtpFailure::MaxAttempts`]（不计次）
    /// 4. 计次加一，然后比较：不匹配 → [`OtpFailure::Incorrect`]，匹配 → 成功
    ///
    /// 成功后记录保留，需要调用 [`OtpManager::clear`] 或重新生成才会移除。
    ///
    /// # Arguments
    ///
    /// * `email` - 邮箱
    /// * `candidate` - 用户输入的验证码
    ///
    /// # Returns
    ///
    /// 业务结果总是以 `Ok(ValidationOutcome)` 返回，`Err` 只代表存储失败
    ///
    /// # Example
    ///
    /// ```rust
    /// use otpauth::passwordless::{OtpConfig, OtpFailure, OtpManager};
    ///
    /// let manager = OtpManager::new(OtpConfig::default());
    /// let code = manager.generate("user@example.com").unwrap();
    ///
    /// let wrong = if code == "999999" { "100000" } else { "999999" };
    /// let outcome = manager.validate("user@example.com", wrong).unwrap();
    /// assert_eq!(outcome.failure(), Some(OtpFailure::Incorrect));
    ///
    /// assert!(manager.validate("user@example.com", &code).unwrap().is_success());
    /// ```
    pub fn validate(&self, email: &str, candidate: &str) -> Result<ValidationOutcome> {
        let now = self.clock.now();
        let max_attempts = self.config.max_attempts;
        let mut outcome = ValidationOutcome::Failure(OtpFailure::NoOtp);

        // 事件在存储临界区内写入，与状态转换保持同一顺序
        self.store.update(email, &mut |current| {
            let (next, result) = match current {
                None => (None, ValidationOutcome::Failure(OtpFailure::NoOtp)),
                Some(record) if record.is_expired_at(now) => {
                    (None, ValidationOutcome::Failure(OtpFailure::Expired))
                }
                Some(record) if record.attempts >= max_attempts => {
                    (None, ValidationOutcome::Failure(OtpFailure::MaxAttempts))
                }
                Some(record) => {
                    let next = record.with_attempt();
                    let result = if constant_time_compare_str(&next.code, candidate) {
                        ValidationOutcome::Success {
                            attempts: next.attempts,
                        }
                    } else {
                        ValidationOutcome::Failure(OtpFailure::Incorrect)
                    };
                    (Some(next), result)
                }
            };
            self.record_outcome(email, result, now);
            outcome = result;
            next
        })?;

        Ok(outcome)
    }

    fn record_outcome(&self, email: &str, outcome: ValidationOutcome, at: DateTime<Utc>) {
        match outcome {
            ValidationOutcome::Success { attempts } => {
                tracing::info!(email, attempts, "otp validated");
                self.events
                    .log(DomainEvent::otp_validation_success(email, attempts, at));
            }
            ValidationOutcome::Failure(failure) => {
                tracing::warn!(email, reason = failure.reason(), "otp validation failed");
                self.events
                    .log(DomainEvent::otp_validation_failure(email, failure.reason(), at));
            }
        }
    }

    /// 获取记录快照
    ///
    /// # Arguments
    ///
    /// * `email` - 邮箱
    ///
    /// # Returns
    ///
    /// 记录的副本，没有记录时为 `None`。读取不会改变记录状态。
    pub fn get_data(&self, email: &str) -> Result<Option<OtpRecord>> {
        self.store.get(email)
    }

    /// 删除记录
    ///
    /// 之后对该邮箱的校验返回 [`OtpFailure::NoOtp`]，直到重新生成。
    /// 记录不存在时什么也不做。
    pub fn clear(&self, email: &str) -> Result<()> {
        self.store.remove(email)
    }

    /// 剩余尝试次数
    ///
    /// # Returns
    ///
    /// `max_attempts - attempts`；没有记录时返回 `max_attempts`
    pub fn remaining_attempts(&self, email: &str) -> Result<u32> {
        Ok(self
            .store
            .get(email)?
            .map(|r| r.remaining_attempts(self.config.max_attempts))
            .unwrap_or(self.config.max_attempts))
    }

    /// 删除已过期的记录
    pub fn purge_expired(&self) -> Result<usize> {
        let purged = self.store.purge_expired(self.clock.now())?;
        if purged > 0 {
            tracing::debug!(purged, "purged expired otp records");
        }
        Ok(purged)
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// 获取存储
    pub fn store(&self) -> &S {
        &self.store
    }
}
