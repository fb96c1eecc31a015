//! 时间抽象模块
//!
//! 所有过期判断和时间戳都通过 [`Clock`] 获取当前时间，
//! 生产环境使用 [`SystemClock`]，测试中使用 [`MockClock`] 手动推进时间。
//!
//! ```rust
//! use otpauth::clock::{Clock, MockClock};
//! use chrono::Duration;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::seconds(61));
//! assert_eq!(clock.now() - start, Duration::seconds(61));
//! ```

use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// 时钟接口
pub trait Clock: Send + Sync + Debug {
    /// 当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 可手动推进的虚拟时钟
///
/// 克隆出的实例共享同一个时间点。
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    /// 以当前系统时间为起点创建
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// 以指定时间为起点创建
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// 向前推进时间
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// 设置为指定时间
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
