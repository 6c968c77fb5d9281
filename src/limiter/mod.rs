//! 滑动窗口限流器
//!
//! 按 (操作类别, 调用方身份) 维护尾随窗口内的请求时间戳集合。
//! 限流是纵深防御而非正确性依赖：计数存储故障时 fail-open 放行，
//! 避免存储故障自己变成拒绝服务。

pub mod memory;
pub mod redis;

pub use memory::MemorySlidingWindow;
pub use redis::RedisSlidingWindow;

use std::time::Duration;

use async_trait::async_trait;

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// 容量释放时间的保守上界（滑动窗口没有精确的重置点）
    pub reset_at_ms: i64,
}

impl RateLimitDecision {
    /// 从窗口内计数推导判定（计数已包含本次请求）
    pub fn from_count(count: u64, limit: u32, now_ms: i64, window: Duration) -> Self {
        Self {
            allowed: count <= limit as u64,
            limit,
            remaining: (limit as u64).saturating_sub(count) as u32,
            reset_at_ms: now_ms + window.as_millis() as i64,
        }
    }

    /// 计数存储故障时的 fail-open 判定
    pub fn fail_open(limit: u32, now_ms: i64, window: Duration) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: limit,
            reset_at_ms: now_ms + window.as_millis() as i64,
        }
    }

    /// 距容量释放的秒数（Retry-After 用，向上取整）
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let delta = self.reset_at_ms.saturating_sub(now_ms).max(0) as u64;
        delta.div_ceil(1000)
    }
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// 记录一次请求并判定是否放行
    async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision;
}

/// 短链创建类操作的限流 key
pub fn shorten_key(ip: &str) -> String {
    format!("shorten:{}", ip)
}

/// 重定向解析类操作的限流 key
pub fn redirect_key(ip: &str) -> String {
    format!("redirect:{}", ip)
}

/// 密码验证类操作的限流 key
///
/// 按目标链接限定，阻止对单个链接的撞库，同时不惩罚同一调用方
/// 对其它链接的正常访问。
pub fn verify_key(ip: &str, code: &str) -> String {
    format!("verify:{}:{}", ip, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_count() {
        let window = Duration::from_secs(60);

        // 第 N 次（count == limit）仍放行，remaining 归零
        let at_limit = RateLimitDecision::from_count(10, 10, 1_000, window);
        assert!(at_limit.allowed);
        assert_eq!(at_limit.remaining, 0);
        assert_eq!(at_limit.reset_at_ms, 61_000);

        // 第 N+1 次拒绝
        let over = RateLimitDecision::from_count(11, 10, 1_000, window);
        assert!(!over.allowed);
        assert_eq!(over.remaining, 0);
    }

    #[test]
    fn test_fail_open_shape() {
        let decision = RateLimitDecision::fail_open(100, 5_000, Duration::from_secs(60));
        assert!(decision.allowed);
        assert_eq!(decision.limit, 100);
        assert_eq!(decision.remaining, 100);
        assert_eq!(decision.reset_at_ms, 65_000);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_at_ms: 10_500,
        };
        assert_eq!(decision.retry_after_secs(10_000), 1);
        assert_eq!(decision.retry_after_secs(9_000), 2);
        assert_eq!(decision.retry_after_secs(11_000), 0);
    }

    #[test]
    fn test_key_shapes() {
        assert_eq!(redirect_key("1.2.3.4"), "redirect:1.2.3.4");
        assert_eq!(shorten_key("1.2.3.4"), "shorten:1.2.3.4");
        assert_eq!(verify_key("1.2.3.4", "abc123"), "verify:1.2.3.4:abc123");
    }
}
