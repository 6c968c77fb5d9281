use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use strum::{AsRefStr, EnumString};

/// 链接安全状态（由外部扫描服务写入，解析热路径只读）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SecurityStatus {
    Secure,
    Unsafe,
    #[default]
    Unknown,
}

/// 重定向使用的 HTTP 状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum RedirectType {
    MovedPermanently = 301,
    Found = 302,
    #[default]
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
}

impl RedirectType {
    pub fn as_status(&self) -> u16 {
        *self as u16
    }

    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            301 => Some(Self::MovedPermanently),
            302 => Some(Self::Found),
            307 => Some(Self::TemporaryRedirect),
            308 => Some(Self::PermanentRedirect),
            _ => None,
        }
    }
}

/// 短链接领域模型
///
/// 时间戳字段通过 serde 以 RFC 3339 精确往返（过期判断与安全相关，
/// 缓存序列化不允许时区漂移）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    /// 明文目标 URL；`is_encrypted` 为 true 时为 None
    pub original_url: Option<String>,
    /// 端到端加密的密文与 IV；服务端永远不解密
    pub encrypted_url: Option<String>,
    pub encryption_iv: Option<String>,
    pub is_encrypted: bool,
    pub is_enabled: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Argon2id PHC 格式哈希；Some 即表示链接受密码保护
    pub password_hash: Option<String>,
    pub is_public: bool,
    pub security_status: SecurityStatus,
    pub is_verified: bool,
    pub redirect_type: RedirectType,
    pub visits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShortLink {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }
}
