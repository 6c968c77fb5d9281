//! 滑动窗口限流集成测试

use std::time::Duration;

use hoplink::limiter::{MemorySlidingWindow, RateLimiter};

const WINDOW: Duration = Duration::from_millis(60_000);

#[test]
fn test_scenario_eleven_calls_in_one_second() {
    // 规格场景：60 秒窗口限 10，一秒内打 11 次，
    // 第 11 次 allowed=false、remaining=0
    let limiter = MemorySlidingWindow::new();
    let base = 1_700_000_000_000i64;

    let mut last = None;
    for i in 0..11 {
        last = Some(limiter.check_at("redirect:1.2.3.4", 10, WINDOW, base + i * 90));
    }

    let decision = last.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    assert_eq!(decision.limit, 10);
}

#[test]
fn test_reset_is_conservative_upper_bound() {
    let limiter = MemorySlidingWindow::new();
    let base = 1_700_000_000_000i64;

    let decision = limiter.check_at("k", 10, WINDOW, base);
    assert_eq!(decision.reset_at_ms, base + WINDOW.as_millis() as i64);
}

#[tokio::test]
async fn test_real_clock_window_recovers() {
    // 真实时钟路径：短窗口灌满后等窗口滑过，容量恢复
    let limiter = MemorySlidingWindow::new();
    let window = Duration::from_millis(200);

    for _ in 0..3 {
        assert!(limiter.check("k", 3, window).await.allowed);
    }
    assert!(!limiter.check("k", 3, window).await.allowed);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let decision = limiter.check("k", 3, window).await;
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 2);
}
