//! 输入验证
//!
//! 邮箱规范化与格式检查、验证码格式检查。

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, ValidationError};

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// 规范化邮箱：去除首尾空白并转为小写
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 检查邮箱格式
///
/// 匹配 `^[^\s@]+@[^\s@]+\.[^\s@]+$`：恰好一个 `@`，两侧都不含空白，
/// 域名部分包含一个前后都有字符的 `.`。
///
/// # Arguments
///
/// * `email` - 已规范化的邮箱
///
/// # Example
///
/// ```rust
/// use otpauth::validation::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(!is_valid_email("user@localhost"));
/// assert!(!is_valid_email("user example@test.com"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(email))
}

/// 检查验证码格式：恰好 `length` 个 ASCII 数字
pub fn is_valid_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| b.is_ascii_digit())
}

/// 规范化并验证邮箱，返回规范化后的邮箱
pub fn validate_email(raw: &str) -> Result<String> {
    let email = sanitize_email(raw);
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email".into()).into());
    }
    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmail(email).into());
    }
    Ok(email)
}
