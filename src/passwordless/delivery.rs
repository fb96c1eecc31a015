//! 验证码投递
//!
//! 本库不负责真实的邮件/短信发送。[`CodeDelivery`] 是投递通道的接入点，
//! 应用层可以接入 SendGrid、SMTP 等服务。内置实现只用于演示：
//!
//! - [`InAppDelivery`]: 把最新验证码放进进程内信箱，由界面直接展示
//! - [`TracingDelivery`]: 把验证码写入日志流

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;

/// 验证码投递接口
pub trait CodeDelivery: Send + Sync {
    /// 把验证码交给 `email` 对应的接收方
    fn deliver(&self, email: &str, code: &str) -> Result<()>;
}

/// 进程内信箱
///
/// 每个邮箱只保留最新的一条验证码。克隆出的实例共享同一个信箱。
#[derive(Debug, Clone, Default)]
pub struct InAppDelivery {
    mailbox: Arc<RwLock<HashMap<String, String>>>,
}

impl InAppDelivery {
    /// 创建空信箱
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近投递给 `email` 的验证码
    pub fn latest_for(&self, email: &str) -> Option<String> {
        self.mailbox
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(email)
            .cloned()
    }
}

impl CodeDelivery for InAppDelivery {
    fn deliver(&self, email: &str, code: &str) -> Result<()> {
        self.mailbox
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(email.to_string(), code.to_string());
        tracing::debug!(email, "code available in-app");
        Ok(())
    }
}

/// 把验证码写入日志（仅用于演示）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelivery;

impl CodeDelivery for TracingDelivery {
    fn deliver(&self, email: &str, code: &str) -> Result<()> {
        tracing::info!(email, code, "demo delivery");
        Ok(())
    }
}
