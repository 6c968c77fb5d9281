//! 重定向端点
//!
//! 从请求提取 `RequestContext`，调用解析器，把 `Resolution` 映射为
//! HTTP 响应。终态是面向访客的 302 跳转到提示页，不是 API 错误。

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use tracing::{error, trace};

use crate::api::token::VerificationTokenService;
use crate::config::get_config;
use crate::limiter::RateLimitDecision;
use crate::resolver::{RedirectResolver, RequestContext, Resolution, TerminalKind};
use crate::utils::{ip::extract_client_ip, is_valid_short_code};

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Arc<RedirectResolver>>,
        tokens: web::Data<Arc<VerificationTokenService>>,
    ) -> impl Responder {
        let code = path.into_inner();

        if !is_valid_short_code(&code) {
            // 非法短码不进缓存、不进限流 key
            trace!("Invalid short code rejected: {}", &code);
            return Self::terminal_response(&code, TerminalKind::NotFound);
        }

        let ctx = Self::build_context(&req, &code, &tokens);

        match resolver.resolve(&code, &ctx).await {
            Ok(Resolution::Redirect { target_url, status }) => {
                let status = StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::TEMPORARY_REDIRECT);
                HttpResponse::build(status)
                    .insert_header(("Location", target_url))
                    .finish()
            }
            Ok(Resolution::Terminal(kind)) => Self::terminal_response(&code, kind),
            Ok(Resolution::RateLimited(decision)) => Self::rate_limited_response(&decision),
            Err(e) => {
                error!("Redirect resolution failed for '{}': {}", code, e);
                Self::error_response()
            }
        }
    }

    /// 从请求头装配解析上下文
    fn build_context(
        req: &HttpRequest,
        code: &str,
        tokens: &VerificationTokenService,
    ) -> RequestContext {
        let config = get_config();

        let ip = extract_client_ip(req, &config.server.trusted_proxies).unwrap_or_default();

        let referrer = req
            .headers()
            .get("referer")
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        let country = req
            .headers()
            .get(config.analytics.country_header.as_str())
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        let has_password_token = req
            .cookie(&VerificationTokenService::cookie_name(code))
            .map(|cookie| tokens.validate(cookie.value(), code))
            .unwrap_or(false);

        let bypass_safety = req
            .uri()
            .query()
            .map(|q| q.split('&').any(|p| p == "bypass=1" || p == "bypass=true"))
            .unwrap_or(false);

        RequestContext {
            ip,
            referrer,
            country,
            has_password_token,
            bypass_safety,
        }
    }

    /// 终态 → 302 到对应提示页
    fn terminal_response(code: &str, kind: TerminalKind) -> HttpResponse {
        let pages = &get_config().pages;

        let location = match kind {
            TerminalKind::NotFound => pages.not_found.clone(),
            TerminalKind::Disabled => pages.disabled.clone(),
            TerminalKind::Expired => pages.expired.clone(),
            // 密码页与警示页需要知道是哪个短码
            TerminalKind::PasswordRequired => format!("{}/{}", pages.password, code),
            TerminalKind::SafetyWarning => format!("{}/{}", pages.warning, code),
        };

        HttpResponse::Found()
            .insert_header(("Location", location))
            .insert_header(("Cache-Control", "no-store"))
            .finish()
    }

    fn rate_limited_response(decision: &RateLimitDecision) -> HttpResponse {
        let now_ms = Utc::now().timestamp_millis();

        HttpResponse::TooManyRequests()
            .insert_header(("X-RateLimit-Limit", decision.limit.to_string()))
            .insert_header(("X-RateLimit-Remaining", decision.remaining.to_string()))
            .insert_header(("X-RateLimit-Reset", (decision.reset_at_ms / 1000).to_string()))
            .insert_header((
                "Retry-After",
                decision.retry_after_secs(now_ms).to_string(),
            ))
            .body("Too Many Requests")
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }
}

/// Redirect 路由配置
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{code}", web::get().to(RedirectService::handle_redirect))
        .route("/{code}", web::head().to(RedirectService::handle_redirect))
}
