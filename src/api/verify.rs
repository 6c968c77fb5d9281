//! 密码验证端点
//!
//! 校验访客提交的链接密码；通过后签发绑定短码的验证 cookie，
//! 访客带着它重新走重定向端点即可放行。限流 key 按 (IP, 短码)
//! 双重限定，防止对单个链接撞库。

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::token::VerificationTokenService;
use crate::cache::LinkCache;
use crate::config::get_config;
use crate::limiter::{self, RateLimiter};
use crate::utils::password::verify_password;
use crate::utils::{ip::extract_client_ip, is_valid_short_code};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

pub struct VerifyService {}

impl VerifyService {
    pub async fn verify_password(
        req: HttpRequest,
        path: web::Path<String>,
        body: web::Json<VerifyRequest>,
        cache: web::Data<Arc<LinkCache>>,
        rate_limiter: web::Data<Arc<dyn RateLimiter>>,
        tokens: web::Data<Arc<VerificationTokenService>>,
    ) -> impl Responder {
        let code = path.into_inner();
        let config = get_config();

        if !is_valid_short_code(&code) {
            return HttpResponse::NotFound().json(VerifyResponse { verified: false });
        }

        // 每 (IP, 短码) 限流，钝化暴力破解
        let ip = extract_client_ip(&req, &config.server.trusted_proxies).unwrap_or_default();
        let decision = rate_limiter
            .check(
                &limiter::verify_key(&ip, &code),
                config.limits.verify_per_window,
                Duration::from_secs(config.limits.window_secs),
            )
            .await;

        if !decision.allowed {
            warn!("Password verification rate limited for {} on {}", ip, code);
            return HttpResponse::TooManyRequests()
                .insert_header(("X-RateLimit-Limit", decision.limit.to_string()))
                .insert_header(("X-RateLimit-Remaining", decision.remaining.to_string()))
                .json(VerifyResponse { verified: false });
        }

        let link = match cache.get_link(&code).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                return HttpResponse::NotFound().json(VerifyResponse { verified: false });
            }
            Err(e) => {
                warn!("Link store unavailable during verify of '{}': {}", code, e);
                return HttpResponse::InternalServerError()
                    .json(VerifyResponse { verified: false });
            }
        };

        let Some(ref hash) = link.password_hash else {
            // 未设密码的链接没有可验证的东西
            return HttpResponse::BadRequest().json(VerifyResponse { verified: false });
        };

        match verify_password(&body.password, hash) {
            Ok(true) => {
                let token = match tokens.issue(&code) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Failed to issue verification token: {}", e);
                        return HttpResponse::InternalServerError()
                            .json(VerifyResponse { verified: false });
                    }
                };

                debug!("Password verified for link: {}", code);

                let cookie = Cookie::build(VerificationTokenService::cookie_name(&code), token)
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .max_age(time::Duration::minutes(tokens.ttl_minutes() as i64))
                    .finish();

                HttpResponse::Ok()
                    .cookie(cookie)
                    .json(VerifyResponse { verified: true })
            }
            Ok(false) => HttpResponse::Unauthorized().json(VerifyResponse { verified: false }),
            Err(e) => {
                warn!("Password verification error for '{}': {}", code, e);
                HttpResponse::InternalServerError().json(VerifyResponse { verified: false })
            }
        }
    }
}

/// Verify 路由配置
pub fn verify_routes() -> actix_web::Scope {
    web::scope("/api")
        .route(
            "/links/{code}/verify",
            web::post().to(VerifyService::verify_password),
        )
}
