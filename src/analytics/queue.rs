//! 访问事件队列
//!
//! 追加写、破坏性批量弹出的 FIFO。`enqueue` 绝不向调用方抛错：
//! 队列后端故障时记日志丢弃，统计丢失可接受、重定向延迟不可接受。

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::VisitEvent;

#[async_trait]
pub trait VisitQueue: Send + Sync {
    /// 追加一个事件。失败时内部记日志并丢弃，从不向上传播。
    async fn enqueue(&self, event: VisitEvent);

    /// 弹出最多 `max` 个事件（按入队顺序），并将其从队列移除。
    async fn dequeue(&self, max: usize) -> Vec<VisitEvent>;

    /// 当前队列长度（仅用于观测）
    async fn len(&self) -> usize;
}

/// 进程内队列（单机部署与测试用）
#[derive(Default)]
pub struct MemoryVisitQueue {
    inner: Mutex<VecDeque<VisitEvent>>,
}

impl MemoryVisitQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VisitQueue for MemoryVisitQueue {
    async fn enqueue(&self, event: VisitEvent) {
        self.inner.lock().push_back(event);
    }

    async fn dequeue(&self, max: usize) -> Vec<VisitEvent> {
        let mut guard = self.inner.lock();
        let n = max.min(guard.len());
        guard.drain(..n).collect()
    }

    async fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Redis list 队列（LPUSH 入队 / RPOP 批量出队，多实例共享）
pub struct RedisVisitQueue {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key: String,
    /// 入队超时；队列存储故障不允许给重定向响应增加可感知延迟
    enqueue_timeout: Duration,
}

impl RedisVisitQueue {
    pub fn new(client: redis::Client, key: String, enqueue_timeout: Duration) -> Self {
        debug!(
            "RedisVisitQueue created with key '{}', enqueue timeout {:?}",
            key, enqueue_timeout
        );
        Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key,
            enqueue_timeout,
        }
    }

    /// 获取或建立持久连接
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
        debug!("Redis connection established for visit queue");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Visit queue Redis connection reset due to error");
    }

    async fn try_enqueue(&self, payload: String) -> Result<(), redis::RedisError> {
        let mut conn = self.get_connection().await?;
        conn.lpush::<_, _, ()>(&self.key, payload).await
    }
}

#[async_trait]
impl VisitQueue for RedisVisitQueue {
    async fn enqueue(&self, event: VisitEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize visit event, dropping: {}", e);
                return;
            }
        };

        match tokio::time::timeout(self.enqueue_timeout, self.try_enqueue(payload)).await {
            Ok(Ok(())) => {
                trace!("Visit event enqueued for link {}", event.link_id);
            }
            Ok(Err(e)) => {
                warn!("Visit enqueue failed, dropping event: {}", e);
                self.reset_connection().await;
            }
            Err(_) => {
                warn!(
                    "Visit enqueue timed out after {:?}, dropping event",
                    self.enqueue_timeout
                );
                self.reset_connection().await;
            }
        }
    }

    async fn dequeue(&self, max: usize) -> Vec<VisitEvent> {
        let Some(count) = NonZeroUsize::new(max) else {
            return Vec::new();
        };

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to get Redis connection for dequeue: {}", e);
                self.reset_connection().await;
                return Vec::new();
            }
        };

        let payloads: Vec<String> = match conn.rpop(&self.key, Some(count)).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Visit dequeue failed: {}", e);
                self.reset_connection().await;
                return Vec::new();
            }
        };

        payloads
            .iter()
            .filter_map(|p| match serde_json::from_str::<VisitEvent>(p) {
                Ok(event) => Some(event),
                Err(e) => {
                    // 坏事件跳过，不让一条脏数据卡死整个批次
                    warn!("Skipping undecodable visit event: {}", e);
                    None
                }
            })
            .collect()
    }

    async fn len(&self) -> usize {
        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(_) => return 0,
        };

        match conn.llen::<_, usize>(&self.key).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read visit queue length: {}", e);
                0
            }
        }
    }
}
