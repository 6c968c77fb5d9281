pub mod ip;
pub mod password;
pub mod referrer;

/// 短码最大长度（与数据库列宽一致的保守上限）
const MAX_CODE_LEN: usize = 64;

/// 校验短码格式：字母、数字、`-`、`_`，长度 1..=64
///
/// 非法短码在进缓存、进限流 key 之前就拒绝，防止把任意用户输入
/// 当作存储键使用。
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// 生成随机短码
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}
