//! 重定向解析状态机
//!
//! 对单次请求严格按序执行：限流 → 查找 → 启用检查 → 过期检查 →
//! 密码门 → 安全门 → 统计入队 → 重定向。任何未到达最后一步的状态
//! 都是该请求的终态，绝不静默穿透。
//!
//! 顺序本身是约束的一部分：限流必须先于任何缓存/存储访问（防止把
//! 缓存当放大器），启用/过期必须先于密码与安全门（禁用或过期的链接
//! 不泄露自己是否受保护）。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, trace};

use crate::analytics::{COUNTRY_UNKNOWN, VisitEvent, VisitQueue};
use crate::cache::LinkCache;
use crate::errors::Result;
use crate::limiter::{self, RateLimitDecision, RateLimiter};
use crate::storage::{SecurityStatus, ShortLink};
use crate::utils::referrer::referrer_host;

/// 单次解析请求的上下文（由传输层填充）
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// 调用方 IP（限流 key）
    pub ip: String,
    /// Referer header 原始值
    pub referrer: Option<String>,
    /// 可信边缘 header 提供的国家码
    pub country: Option<String>,
    /// 是否已持有本链接的有效密码验证凭据
    pub has_password_token: bool,
    /// 是否明确选择跳过安全警告
    pub bypass_safety: bool,
}

/// 未到达目标重定向的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    NotFound,
    Disabled,
    Expired,
    PasswordRequired,
    SafetyWarning,
}

/// 解析结果
#[derive(Debug, Clone)]
pub enum Resolution {
    /// 放行：跳转到目标 URL
    Redirect { target_url: String, status: u16 },
    /// 终态：跳转到对应的提示页
    Terminal(TerminalKind),
    /// 限流拒绝（携带响应头所需信息）
    RateLimited(RateLimitDecision),
}

/// 解析器策略参数（来自配置，构造时注入）
#[derive(Debug, Clone)]
pub struct ResolverPolicy {
    pub redirect_limit: u32,
    pub window: Duration,
    /// 端到端加密链接跳转的客户端解密页
    pub decrypt_page: String,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            redirect_limit: 100,
            window: Duration::from_secs(60),
            decrypt_page: "/decrypt".to_string(),
        }
    }
}

pub struct RedirectResolver {
    cache: Arc<LinkCache>,
    limiter: Arc<dyn RateLimiter>,
    queue: Arc<dyn VisitQueue>,
    policy: ResolverPolicy,
}

impl RedirectResolver {
    pub fn new(
        cache: Arc<LinkCache>,
        limiter: Arc<dyn RateLimiter>,
        queue: Arc<dyn VisitQueue>,
        policy: ResolverPolicy,
    ) -> Self {
        Self {
            cache,
            limiter,
            queue,
            policy,
        }
    }

    /// 解析一个短码
    ///
    /// 只有 Link Store 本身不可用才返回 `Err`（上层映射为 5xx）；
    /// 其余一切情况都是某种 `Resolution`。
    pub async fn resolve(&self, code: &str, ctx: &RequestContext) -> Result<Resolution> {
        // 1. 限流：先于任何缓存/存储访问
        let decision = self
            .limiter
            .check(
                &limiter::redirect_key(&ctx.ip),
                self.policy.redirect_limit,
                self.policy.window,
            )
            .await;

        if !decision.allowed {
            debug!("Redirect rate limited for {}", ctx.ip);
            return Ok(Resolution::RateLimited(decision));
        }

        // 2. 查找（缓存 → 存储回源）
        let Some(link) = self.cache.get_link(code).await.inspect_err(|e| {
            error!("Link store unavailable during resolve of '{}': {}", code, e);
        })?
        else {
            trace!("Short code not found: {}", code);
            return Ok(Resolution::Terminal(TerminalKind::NotFound));
        };

        // 3. 启用检查
        if !link.is_enabled {
            return Ok(Resolution::Terminal(TerminalKind::Disabled));
        }

        // 4. 过期检查
        if link.is_expired_at(Utc::now()) {
            return Ok(Resolution::Terminal(TerminalKind::Expired));
        }

        // 5. 密码门
        if link.requires_password() && !ctx.has_password_token {
            return Ok(Resolution::Terminal(TerminalKind::PasswordRequired));
        }

        // 6. 安全门
        if link.security_status == SecurityStatus::Unsafe && !ctx.bypass_safety {
            return Ok(Resolution::Terminal(TerminalKind::SafetyWarning));
        }

        // 7. 统计入队：显式后台派发。请求方断开也要完成入队，
        //    且入队失败由队列内部吞掉，永不影响响应
        let event = VisitEvent {
            link_id: link.id,
            referrer_host: referrer_host(ctx.referrer.as_deref()),
            country_code: normalize_country(ctx.country.as_deref()),
            occurred_at: Utc::now(),
        };
        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            queue.enqueue(event).await;
        });

        // 8. 重定向
        Ok(Resolution::Redirect {
            target_url: self.destination_for(&link),
            status: link.redirect_type.as_status(),
        })
    }

    /// 目标 URL
    ///
    /// 加密链接的明文只存在于客户端，服务端跳到解密页由前端完成
    /// 解密后的二跳。
    fn destination_for(&self, link: &ShortLink) -> String {
        if link.is_encrypted {
            return format!("{}/{}", self.policy.decrypt_page, link.short_code);
        }

        match &link.original_url {
            Some(url) => url.clone(),
            None => {
                // 两种表示都缺失属于数据损坏；当作解密页兜底而不是 panic
                error!(
                    "Link {} has neither original_url nor encrypted payload",
                    link.short_code
                );
                format!("{}/{}", self.policy.decrypt_page, link.short_code)
            }
        }
    }
}

fn normalize_country(country: Option<&str>) -> String {
    match country {
        Some(c) if !c.trim().is_empty() => c.trim().to_uppercase(),
        _ => COUNTRY_UNKNOWN.to_string(),
    }
}
