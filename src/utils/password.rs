//! 密码哈希工具模块
//!
//! 使用 Argon2id 算法进行密码哈希和验证

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// 密码哈希错误
#[derive(Debug)]
pub enum PasswordError {
    HashError(String),
    VerifyError(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashError(msg) => write!(f, "Password hash error: {}", msg),
            Self::VerifyError(msg) => write!(f, "Password verify error: {}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// 验证密码是否匹配哈希
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::VerifyError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 处理用户输入的新密码 - 始终哈希，不接受预哈希值
pub fn process_new_password(password: Option<&str>) -> Result<Option<String>, PasswordError> {
    match password {
        Some(pwd) if !pwd.is_empty() => hash_password(pwd).map(Some),
        _ => Ok(None),
    }
}

/// 处理更新密码
///
/// - `new_password` 为 None → 保留原密码
/// - 为空字符串 → 移除密码
/// - 否则哈希新密码
pub fn process_update_password(
    new_password: Option<&str>,
    existing_hash: Option<String>,
) -> Result<Option<String>, PasswordError> {
    match new_password {
        Some(pwd) if !pwd.is_empty() => hash_password(pwd).map(Some),
        Some(_) => Ok(None),
        None => Ok(existing_hash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("hash should succeed");

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong_password", &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_process_update_password() {
        let existing = Some("$argon2id$existing".to_string());

        // None 保留原哈希
        assert_eq!(
            process_update_password(None, existing.clone()).unwrap(),
            existing
        );
        // 空字符串移除密码
        assert_eq!(process_update_password(Some(""), existing).unwrap(), None);
        // 新密码被哈希
        let updated = process_update_password(Some("new"), None).unwrap().unwrap();
        assert!(verify_password("new", &updated).unwrap());
    }
}
