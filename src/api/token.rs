//! 链接密码验证凭据
//!
//! 密码验证通过后签发短时效、绑定单个短码的 JWT，放在 cookie 里；
//! 解析器只检查凭据是否有效，不做任何密码比较。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;

const TOKEN_TYPE: &str = "link_password";

/// 验证凭据 Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyClaims {
    /// 绑定的短码
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

/// 验证凭据的签发与校验
pub struct VerificationTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: u64,
}

impl VerificationTokenService {
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    /// 为某个短码签发验证凭据
    pub fn issue(&self, code: &str) -> Result<String> {
        let now = Utc::now();
        let claims = VerifyClaims {
            sub: code.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE.to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// 校验凭据是否有效且绑定到给定短码
    pub fn validate(&self, token: &str, code: &str) -> bool {
        let validation = Validation::default();

        match decode::<VerifyClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims.token_type == TOKEN_TYPE && data.claims.sub == code,
            Err(e) => {
                warn!("Verification token rejected: {}", e);
                false
            }
        }
    }

    /// 该短码对应的 cookie 名
    pub fn cookie_name(code: &str) -> String {
        format!("hoplink_verify_{}", code)
    }

    pub fn ttl_minutes(&self) -> u64 {
        self.ttl_minutes
    }
}
