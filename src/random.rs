//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于生成验证码和 Session ID。

use rand::{Rng, TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的密码学安全随机数生成器 (CSPRNG)
///
/// # Example
///
/// ```rust
/// use otpauth::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(32).unwrap();
/// assert_eq!(bytes.len(), 32);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成指定长度的 Base64 URL 安全随机字符串（不含填充）
pub fn generate_random_base64_url(byte_length: usize) -> Result<String> {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    let bytes = generate_random_bytes(byte_length)?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// 生成安全的 session token
///
/// 使用 32 字节（256 位）的随机数据
pub fn generate_session_token() -> Result<String> {
    generate_random_base64_url(32)
}

/// 生成指定位数的数字验证码
///
/// 验证码从 `[10^(n-1), 10^n)` 中均匀抽取，因此首位永远不是 `0`。
/// 6 位验证码的取值范围为 `[100000, 999999]`。
///
/// ```rust
/// use otpauth::random::generate_numeric_code;
///
/// let code = generate_numeric_code(6);
/// let value: u64 = code.parse().unwrap();
/// assert!((100_000..=999_999).contains(&value));
/// ```
pub fn generate_numeric_code(digits: usize) -> String {
    let min = 10u64.pow((digits - 1) as u32);
    let max = 10u64.pow(digits as u32);
    generate_random_in_range(min, max).to_string()
}

/// 生成 [min, max) 范围内的随机数
pub fn generate_random_in_range(min: u64, max: u64) -> u64 {
    rand::rng().random_range(min..max)
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击
///
/// ```rust
/// use otpauth::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"123456", b"123456"));
/// assert!(!constant_time_compare(b"123456", b"654321"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}
