//! 领域事件日志模块
//!
//! 记录 OTP 生命周期和 Session 相关的领域事件，供分析/审计使用：
//!
//! - **领域事件**: 固定的 `{name, timestamp, data}` 三元组
//! - **EventSink Trait**: 事件记录接口
//! - **内存实现**: 追加式存储，写入后立即可读
//!
//! ## 使用示例
//!
//! ```rust
//! use otpauth::audit::{DomainEvent, EventSink, InMemoryEventSink};
//! use chrono::Utc;
//!
//! let sink = InMemoryEventSink::new();
//!
//! sink.log(DomainEvent::otp_generated("user@example.com", Utc::now()));
//! sink.log(DomainEvent::otp_validation_failure("user@example.com", "incorrect", Utc::now()));
//!
//! assert_eq!(sink.len(), 2);
//! assert_eq!(sink.events_for_email("user@example.com").len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 内置事件类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 生成了新的验证码
    OtpGenerated,
    /// 验证码校验成功
    OtpValidationSuccess,
    /// 验证码校验失败
    OtpValidationFailure,
    /// 用户登出
    UserLogout,
    /// 自定义事件
    Custom(String),
}

impl EventKind {
    /// 事件名称
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::OtpGenerated => "otp_generated",
            EventKind::OtpValidationSuccess => "otp_validation_success",
            EventKind::OtpValidationFailure => "otp_validation_failure",
            EventKind::UserLogout => "user_logout",
            EventKind::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 领域事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// 事件名称
    pub name: String,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
    /// 事件数据
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl DomainEvent {
    /// 创建新的事件
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: kind.as_str().to_string(),
            timestamp,
            data: Map::new(),
        }
    }

    /// 创建自定义事件
    pub fn custom(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::Custom(name.into()), timestamp)
    }

    // ========================================================================
    // 便捷构造方法
    // ========================================================================

    /// `otp_generated { email, timestamp }`
    pub fn otp_generated(email: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::OtpGenerated, timestamp)
            .with_data("email", email.into())
            .with_data("timestamp", timestamp.timestamp_millis())
    }

    /// `otp_validation_success { email, attempts }`
    pub fn otp_validation_success(
        email: impl Into<String>,
        attempts: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(EventKind::OtpValidationSuccess, timestamp)
            .with_data("email", email.into())
            .with_data("attempts", attempts)
    }

    /// `otp_validation_failure { email, reason }`
    pub fn otp_validation_failure(
        email: impl Into<String>,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(EventKind::OtpValidationFailure, timestamp)
            .with_data("email", email.into())
            .with_data("reason", reason.into())
    }

    /// `user_logout { email, session_duration }`，时长单位为秒
    pub fn user_logout(
        email: impl Into<String>,
        session_duration_secs: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(EventKind::UserLogout, timestamp)
            .with_data("email", email.into())
            .with_data("session_duration", session_duration_secs)
    }

    /// 添加数据字段
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// 事件关联的邮箱（如果有）
    pub fn email(&self) -> Option<&str> {
        self.data.get("email").and_then(Value::as_str)
    }

    /// 检查事件名称
    pub fn is(&self, kind: &EventKind) -> bool {
        self.name == kind.as_str()
    }
}

// ============================================================================
// EventSink Trait
// ============================================================================

/// 领域事件记录接口
pub trait EventSink: Send + Sync {
    /// 记录事件
    fn log(&self, event: DomainEvent);

    /// 批量记录事件
    fn log_batch(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.log(event);
        }
    }
}

// ============================================================================
// InMemoryEventSink
// ============================================================================

/// 内存事件日志
///
/// 事件按追加顺序保存，没有容量上限。克隆出的实例共享同一份存储。
/// 每条事件同时以 `tracing` 事件的形式输出。
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<DomainEvent>>>,
}

impl InMemoryEventSink {
    /// 创建新的内存事件日志
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<DomainEvent>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<DomainEvent>> {
        self.events.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 获取所有事件
    pub fn events(&self) -> Vec<DomainEvent> {
        self.read().clone()
    }

    /// 事件数量
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 按名称获取事件
    pub fn events_named(&self, kind: &EventKind) -> Vec<DomainEvent> {
        self.read().iter().filter(|e| e.is(kind)).cloned().collect()
    }

    /// 按邮箱获取事件（保持追加顺序）
    pub fn events_for_email(&self, email: &str) -> Vec<DomainEvent> {
        self.read()
            .iter()
            .filter(|e| e.email() == Some(email))
            .cloned()
            .collect()
    }

    /// 最近一条事件
    pub fn last(&self) -> Option<DomainEvent> {
        self.read().last().cloned()
    }

    /// 按名称统计
    pub fn count_by_name(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for event in self.read().iter() {
            *counts.entry(event.name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// 清空所有事件
    pub fn clear(&self) {
        self.write().clear();
    }
}

impl EventSink for InMemoryEventSink {
    fn log(&self, event: DomainEvent) {
        tracing::info!(
            target: "otpauth::audit",
            event = %event.name,
            data = %serde_json::Value::Object(event.data.clone()),
            "domain event"
        );
        self.write().push(event);
    }
}

// ============================================================================
// NoOpEventSink
// ============================================================================

/// 空操作事件日志，用于禁用事件记录
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn log(&self, _event: DomainEvent) {}
}
