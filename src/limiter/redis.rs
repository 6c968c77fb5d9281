use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{RateLimitDecision, RateLimiter};

/// Redis sorted-set 滑动窗口（多实例共享计数）
///
/// 一次原子 pipeline 完成：剔除窗口外成员 → 记录本次请求 → 取计数 →
/// 给整个 key 续 PEXPIRE（一个完整空闲窗口后整键过期，内存有界）。
pub struct RedisSlidingWindow {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    /// 单次判定的超时；超时视作存储故障，fail-open
    check_timeout: Duration,
}

impl RedisSlidingWindow {
    pub fn new(client: redis::Client, key_prefix: String, check_timeout: Duration) -> Self {
        debug!(
            "RedisSlidingWindow created with prefix '{}', timeout {:?}",
            key_prefix, check_timeout
        );
        Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix,
            check_timeout,
        }
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established for rate limiter");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Rate limiter Redis connection reset due to error");
    }

    async fn count_in_window(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<u64, redis::RedisError> {
        let mut conn = self.get_connection().await?;

        let window_ms = window.as_millis() as i64;
        let cutoff = now_ms - window_ms;
        // 成员须唯一，同一毫秒的并发请求不能互相吞掉
        let member = format!("{}-{}", now_ms, uuid::Uuid::new_v4());

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .zrembyscore(key, 0, cutoff)
            .ignore()
            .zadd(key, member, now_ms)
            .ignore()
            .zcard(key)
            .pexpire(key, window_ms)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl RateLimiter for RedisSlidingWindow {
    async fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        let now_ms = Utc::now().timestamp_millis();
        let redis_key = format!("{}{}", self.key_prefix, key);

        match tokio::time::timeout(
            self.check_timeout,
            self.count_in_window(&redis_key, now_ms, window),
        )
        .await
        {
            Ok(Ok(count)) => RateLimitDecision::from_count(count, limit, now_ms, window),
            Ok(Err(e)) => {
                warn!("Rate limit store error for '{}', failing open: {}", key, e);
                self.reset_connection().await;
                RateLimitDecision::fail_open(limit, now_ms, window)
            }
            Err(_) => {
                warn!(
                    "Rate limit check timed out after {:?} for '{}', failing open",
                    self.check_timeout, key
                );
                self.reset_connection().await;
                RateLimitDecision::fail_open(limit, now_ms, window)
            }
        }
    }
}
