use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{RateLimitDecision, RateLimiter};

/// 每多少次判定做一轮全表清扫
const SWEEP_EVERY: u64 = 1024;

/// 进程内滑动窗口（单机部署与测试用）
///
/// 每个 key 存窗口内的时间戳列表；访问时先剔除窗口外的旧时间戳。
/// 闲置 key 由周期性清扫回收，保证内存随活跃 key 数有界。
#[derive(Default)]
pub struct MemorySlidingWindow {
    windows: DashMap<String, (Vec<i64>, Duration)>,
    checks: AtomicU64,
}

impl MemorySlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以显式时间判定（测试的确定性入口）
    pub fn check_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now_ms: i64,
    ) -> RateLimitDecision {
        let cutoff = now_ms - window.as_millis() as i64;

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| (Vec::new(), window));
        entry.0.retain(|&ts| ts > cutoff);
        entry.0.push(now_ms);
        entry.1 = window;
        let count = entry.0.len() as u64;
        drop(entry);

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now_ms);
        }

        RateLimitDecision::from_count(count, limit, now_ms, window)
    }

    /// 删除整个窗口都已滑过的闲置 key
    fn sweep(&self, now_ms: i64) {
        self.windows.retain(|_, (timestamps, window)| {
            let cutoff = now_ms - window.as_millis() as i64;
            timestamps.iter().any(|&ts| ts > cutoff)
        });
    }

    /// 当前跟踪的 key 数（仅用于观测）
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// 清理某个 key（测试辅助）
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }
}

#[async_trait]
impl RateLimiter for MemorySlidingWindow {
    async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, limit, window, Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(60_000);

    #[test]
    fn test_window_allows_exactly_limit() {
        let limiter = MemorySlidingWindow::new();
        let base = 1_000_000;

        // 同一窗口内前 N 次放行
        for i in 0..10 {
            let decision = limiter.check_at("redirect:1.2.3.4", 10, WINDOW, base + i);
            assert!(decision.allowed, "call {} should be allowed", i + 1);
        }

        // 第 N+1 次拒绝，remaining == 0
        let denied = limiter.check_at("redirect:1.2.3.4", 10, WINDOW, base + 10);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.limit, 10);
    }

    #[test]
    fn test_window_slides() {
        let limiter = MemorySlidingWindow::new();
        let base = 1_000_000;

        for i in 0..10 {
            limiter.check_at("k", 10, WINDOW, base + i);
        }
        assert!(!limiter.check_at("k", 10, WINDOW, base + 100).allowed);

        // 等满一个窗口后容量恢复
        let later = base + 100 + WINDOW.as_millis() as i64 + 1;
        let decision = limiter.check_at("k", 10, WINDOW, later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[test]
    fn test_partial_expiry_mid_window() {
        let limiter = MemorySlidingWindow::new();
        let base = 1_000_000;
        let window = Duration::from_millis(1_000);

        // 5 次在窗口前沿，5 次在后沿
        for i in 0..5 {
            limiter.check_at("k", 10, window, base + i);
        }
        for i in 0..5 {
            limiter.check_at("k", 10, window, base + 900 + i);
        }
        assert!(!limiter.check_at("k", 10, window, base + 950).allowed);

        // 前 5 个过期后，窗口内只剩后沿的请求，重新放行
        let decision = limiter.check_at("k", 10, window, base + 1_100);
        assert!(decision.allowed);
    }

    #[test]
    fn test_sweep_evicts_idle_keys() {
        let limiter = MemorySlidingWindow::new();
        let base = 1_000_000;
        let short = Duration::from_millis(100);

        limiter.check_at("idle", 10, short, base);
        assert_eq!(limiter.tracked_keys(), 1);

        // 窗口滑过后，下一轮清扫回收闲置 key
        for i in 0..(super::SWEEP_EVERY as i64 + 1) {
            limiter.check_at("busy", 1_000_000, WINDOW, base + 200 + i);
        }
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = MemorySlidingWindow::new();
        let base = 1_000_000;

        for i in 0..10 {
            limiter.check_at("redirect:1.2.3.4", 10, WINDOW, base + i);
        }
        assert!(!limiter.check_at("redirect:1.2.3.4", 10, WINDOW, base + 20).allowed);

        // 其他调用方不受影响
        assert!(limiter.check_at("redirect:5.6.7.8", 10, WINDOW, base + 20).allowed);
        // 同一调用方的其他操作类别也不受影响
        assert!(limiter.check_at("verify:1.2.3.4:abc", 5, WINDOW, base + 20).allowed);
    }
}
