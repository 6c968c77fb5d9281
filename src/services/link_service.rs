//! 链接写服务（CRUD 写层对核心的契约实现）
//!
//! 所有变更在存储提交成功之后、返回调用方之前同步失效缓存；
//! 短码重命名时旧码新码都失效。创建后预热，省掉首次访问的必然 miss。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::LinkCache;
use crate::errors::{HoplinkError, Result};
use crate::storage::{RedirectType, SeaOrmStorage, SecurityStatus, ShortLink};
use crate::utils::password::{process_new_password, process_update_password};
use crate::utils::{generate_random_code, is_valid_short_code};

/// 随机短码长度
const GENERATED_CODE_LEN: usize = 7;

/// 创建请求
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    /// 省略时自动生成
    pub short_code: Option<String>,
    pub original_url: Option<String>,
    pub encrypted_url: Option<String>,
    pub encryption_iv: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// 明文密码，存储前哈希
    pub password: Option<String>,
    pub is_public: bool,
    pub redirect_type: Option<RedirectType>,
}

/// 更新请求（None 表示保持不变）
#[derive(Debug, Clone, Default)]
pub struct UpdateLink {
    pub original_url: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// Some("") 移除密码，Some(其他) 重设密码
    pub password: Option<String>,
    pub is_enabled: Option<bool>,
    pub is_public: Option<bool>,
    pub redirect_type: Option<RedirectType>,
    pub security_status: Option<SecurityStatus>,
}

pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
    cache: Arc<LinkCache>,
}

impl LinkService {
    pub fn new(storage: Arc<SeaOrmStorage>, cache: Arc<LinkCache>) -> Self {
        Self { storage, cache }
    }

    /// 创建链接
    pub async fn create(&self, new_link: NewLink) -> Result<ShortLink> {
        let short_code = match new_link.short_code {
            Some(code) => {
                if !is_valid_short_code(&code) {
                    return Err(HoplinkError::validation(format!("非法短码: {}", code)));
                }
                code
            }
            None => generate_random_code(GENERATED_CODE_LEN),
        };

        let is_encrypted = new_link.encrypted_url.is_some();
        if is_encrypted == new_link.original_url.is_some() {
            return Err(HoplinkError::validation(
                "明文 URL 与加密载荷必须恰好提供一种".to_string(),
            ));
        }

        let password_hash = process_new_password(new_link.password.as_deref())
            .map_err(|e| HoplinkError::validation(e.to_string()))?;

        // 密码保护与公开互斥，写层强制
        if password_hash.is_some() && new_link.is_public {
            return Err(HoplinkError::validation(
                "密码保护的链接不能标记为公开".to_string(),
            ));
        }

        let now = Utc::now();
        let link = ShortLink {
            id: 0, // 由数据库分配
            short_code,
            original_url: new_link.original_url,
            encrypted_url: new_link.encrypted_url,
            encryption_iv: new_link.encryption_iv,
            is_encrypted,
            is_enabled: true,
            expires_at: new_link.expires_at,
            password_hash,
            is_public: new_link.is_public,
            security_status: SecurityStatus::Unknown,
            is_verified: false,
            redirect_type: new_link.redirect_type.unwrap_or_default(),
            visits: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.storage.insert(link).await?;

        // 预热缓存，首个重定向不必回源
        self.cache.warm(&created).await;

        Ok(created)
    }

    /// 更新链接属性
    pub async fn update(&self, code: &str, changes: UpdateLink) -> Result<ShortLink> {
        let mut link = self
            .storage
            .find_by_code(code)
            .await?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: {}", code)))?;

        if let Some(url) = changes.original_url {
            if link.is_encrypted {
                return Err(HoplinkError::validation(
                    "加密链接不能改写明文 URL".to_string(),
                ));
            }
            link.original_url = Some(url);
        }
        if let Some(expires_at) = changes.expires_at {
            link.expires_at = expires_at;
        }
        if let Some(enabled) = changes.is_enabled {
            link.is_enabled = enabled;
        }
        if let Some(redirect_type) = changes.redirect_type {
            link.redirect_type = redirect_type;
        }
        if let Some(status) = changes.security_status {
            link.security_status = status;
        }

        link.password_hash =
            process_update_password(changes.password.as_deref(), link.password_hash.take())
                .map_err(|e| HoplinkError::validation(e.to_string()))?;

        if let Some(is_public) = changes.is_public {
            link.is_public = is_public;
        }
        if link.password_hash.is_some() && link.is_public {
            return Err(HoplinkError::validation(
                "密码保护的链接不能标记为公开".to_string(),
            ));
        }

        link.updated_at = Utc::now();
        self.storage.update(&link).await?;

        // 存储提交后、返回前同步失效
        self.cache.invalidate(code).await;

        Ok(link)
    }

    /// 启用/禁用
    pub async fn set_enabled(&self, code: &str, enabled: bool) -> Result<ShortLink> {
        self.update(
            code,
            UpdateLink {
                is_enabled: Some(enabled),
                ..Default::default()
            },
        )
        .await
    }

    /// 重命名短码（事务内重查唯一性）
    pub async fn rename(&self, old_code: &str, new_code: &str) -> Result<ShortLink> {
        if !is_valid_short_code(new_code) {
            return Err(HoplinkError::validation(format!("非法短码: {}", new_code)));
        }

        let link = self
            .storage
            .find_by_code(old_code)
            .await?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: {}", old_code)))?;

        self.storage.rename(link.id, new_code).await?;

        // 旧码新码都要失效
        self.cache.invalidate(old_code).await;
        self.cache.invalidate(new_code).await;

        info!("Link renamed: {} -> {}", old_code, new_code);

        self.storage
            .find_by_code(new_code)
            .await?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: {}", new_code)))
    }

    /// 删除链接（连同汇总行），并清缓存
    pub async fn delete(&self, code: &str) -> Result<()> {
        let link = self
            .storage
            .find_by_code(code)
            .await?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: {}", code)))?;

        self.storage.delete(link.id).await?;
        self.cache.invalidate(code).await;

        Ok(())
    }
}
