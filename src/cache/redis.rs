use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use super::{CacheLookup, CacheStore};
use crate::storage::ShortLink;

pub struct RedisCacheStore {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn new(client: redis::Client, key_prefix: String) -> Self {
        debug!("RedisCacheStore created with prefix: '{}'", key_prefix);
        Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix,
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
        debug!("Redis connection established for link cache");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Link cache Redis connection reset due to error");
    }

    fn make_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, code: &str) -> CacheLookup {
        let redis_key = self.make_key(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return CacheLookup::Unavailable;
            }
        };

        let result: redis::RedisResult<Option<String>> = conn.get(&redis_key).await;

        match result {
            Ok(Some(data)) => match serde_json::from_str::<ShortLink>(&data) {
                Ok(link) => {
                    trace!("Successfully retrieved cached link: {}", code);
                    CacheLookup::Hit(link)
                }
                Err(e) => {
                    // 坏条目当作后端故障处理：直读数据库且不写回
                    error!("Failed to deserialize cached link '{}': {}", code, e);
                    CacheLookup::Unavailable
                }
            },
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                error!("Failed to get cached link '{}': {}", code, e);
                self.reset_connection().await;
                CacheLookup::Unavailable
            }
        }
    }

    async fn put(&self, code: &str, link: &ShortLink, ttl: Duration) {
        let redis_key = self.make_key(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        let serialized = match serde_json::to_string(link) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to serialize link '{}' for cache: {}", code, e);
                return;
            }
        };

        match conn
            .set_ex::<_, _, ()>(redis_key, serialized, ttl.as_secs())
            .await
        {
            Ok(_) => {
                trace!("Cached link: {}", code);
            }
            Err(e) => {
                error!("Failed to cache link '{}': {}", code, e);
                self.reset_connection().await;
            }
        }
    }

    async fn delete(&self, code: &str) {
        let redis_key = self.make_key(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        match conn.del::<_, i32>(redis_key).await {
            Ok(deleted_count) => {
                if deleted_count > 0 {
                    trace!("Invalidated cached link: {}", code);
                } else {
                    trace!("No cache entry to invalidate for: {}", code);
                }
            }
            Err(e) => {
                error!("Failed to invalidate cached link '{}': {}", code, e);
                self.reset_connection().await;
            }
        }
    }
}
