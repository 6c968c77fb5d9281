use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};

use crate::storage::models::{RedirectType, SecurityStatus, ShortLink};
use migration::entities::short_link;

/// 将 Sea-ORM Model 转换为 ShortLink
///
/// 数据库里的非法枚举值按保守方向兜底（unknown / 307），不让脏数据
/// 打断解析热路径。
pub fn model_to_shortlink(model: short_link::Model) -> ShortLink {
    ShortLink {
        id: model.id,
        short_code: model.short_code,
        original_url: model.original_url,
        encrypted_url: model.encrypted_url,
        encryption_iv: model.encryption_iv,
        is_encrypted: model.is_encrypted,
        is_enabled: model.is_enabled,
        expires_at: model.expires_at,
        password_hash: model.password_hash,
        is_public: model.is_public,
        security_status: SecurityStatus::from_str(&model.security_status)
            .unwrap_or(SecurityStatus::Unknown),
        is_verified: model.is_verified,
        redirect_type: RedirectType::from_status(model.redirect_type as u16).unwrap_or_default(),
        visits: model.visits.max(0),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// 将 ShortLink 转换为 ActiveModel（用于插入/更新）
pub fn shortlink_to_active_model(link: &ShortLink, is_new: bool) -> short_link::ActiveModel {
    short_link::ActiveModel {
        id: if is_new { NotSet } else { Set(link.id) },
        short_code: Set(link.short_code.clone()),
        original_url: Set(link.original_url.clone()),
        encrypted_url: Set(link.encrypted_url.clone()),
        encryption_iv: Set(link.encryption_iv.clone()),
        is_encrypted: Set(link.is_encrypted),
        is_enabled: Set(link.is_enabled),
        expires_at: Set(link.expires_at),
        password_hash: Set(link.password_hash.clone()),
        is_public: Set(link.is_public),
        security_status: Set(link.security_status.as_ref().to_string()),
        is_verified: Set(link.is_verified),
        redirect_type: Set(link.redirect_type.as_status() as i16),
        visits: if is_new { Set(link.visits) } else { NotSet },
        created_at: if is_new { Set(link.created_at) } else { NotSet },
        updated_at: Set(link.updated_at),
    }
}
