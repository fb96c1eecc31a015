//! OTP 存储
//!
//! 每个邮箱最多保存一条 [`OtpRecord`]，写入即覆盖。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::otp::OtpRecord;
use crate::error::{Error, Result};

// ============================================================================
// 存储接口
// ============================================================================

/// OTP 存储接口
///
/// 实现此 trait 以提供自定义的存储后端（如 Redis、数据库等）。
/// [`OtpStore::update`] 必须是原子的：生成与校验流程依赖它完成
/// "读取-检查-递增-比较"，并在同一临界区内写入领域事件。
pub trait OtpStore: Send + Sync {
    /// 保存记录，无条件覆盖旧记录
    fn put(&self, email: &str, record: OtpRecord) -> Result<()>;

    /// 获取记录
    fn get(&self, email: &str) -> Result<Option<OtpRecord>>;

    /// 删除记录，不存在时什么也不做
    fn remove(&self, email: &str) -> Result<()>;

    /// 原子地对记录执行状态转换
    ///
    /// `transition` 收到当前记录（不存在时为 `None`），返回 `Some(new)` 时写入新记录，
    /// 返回 `None` 时保持不变。同一邮箱的转换严格串行。
    ///
    /// # Arguments
    ///
    /// * `email` - 记录的键
    /// * `transition` - 状态转换函数，在存储的临界区内执行
    fn update(
        &self,
        email: &str,
        transition: &mut dyn FnMut(Option<&OtpRecord>) -> Option<OtpRecord>,
    ) -> Result<()>;

    /// 删除在 `now` 时刻已过期的记录，返回删除数量
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// 当前记录数量
    fn len(&self) -> Result<usize>;

    /// 是否没有任何记录
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: OtpStore + ?Sized> OtpStore for Arc<S> {
    fn put(&self, email: &str, record: OtpRecord) -> Result<()> {
        (**self).put(email, record)
    }

    fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
        (**self).get(email)
    }

    fn remove(&self, email: &str) -> Result<()> {
        (**self).remove(email)
    }

    fn update(
        &self,
        email: &str,
        transition: &mut dyn FnMut(Option<&OtpRecord>) -> Option<OtpRecord>,
    ) -> Result<()> {
        (**self).update(email, transition)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        (**self).purge_expired(now)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 内存存储实现
///
/// 适用于单实例部署或测试环境，克隆出的实例共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct InMemoryOtpStore {
    /// email -> 记录
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
}

impl InMemoryOtpStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有记录的快照
    pub fn snapshot(&self) -> Result<HashMap<String, OtpRecord>> {
        let records = self.records.read().map_err(|_| Error::lock_poisoned())?;
        Ok(records.clone())
    }
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, email: &str, record: OtpRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Error::lock_poisoned())?;
        records.insert(email.to_string(), record);
        Ok(())
    }

    fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
        let records = self.records.read().map_err(|_| Error::lock_poisoned())?;
        Ok(records.get(email).cloned())
    }

    fn remove(&self, email: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Error::lock_poisoned())?;
        records.remove(email);
        Ok(())
    }

    fn update(
        &self,
        email: &str,
        transition: &mut dyn FnMut(Option<&OtpRecord>) -> Option<OtpRecord>,
    ) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Error::lock_poisoned())?;
        if let Some(next) = transition(records.get(email)) {
            tracing::debug!(email, attempts = next.attempts, "otp record updated");
            records.insert(email.to_string(), next);
        }
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.write().map_err(|_| Error::lock_poisoned())?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok(before - records.len())
    }

    fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| Error::lock_poisoned())?;
        Ok(records.len())
    }
}
