//! 短链接读缓存（cache-aside）
//!
//! `CacheStore` 是裸的 TTL KV 后端（Redis / moka）；`LinkCache` 在其上
//! 实现 cache-aside 读路径与显式失效。缓存只是性能优化：后端不可用时
//! 降级为直读数据库，绝不影响重定向正确性。

pub mod memory;
pub mod redis;

pub use memory::MokaCacheStore;
pub use redis::RedisCacheStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::storage::{LinkStore, ShortLink};

/// 缓存探测结果
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// 命中，拿到反序列化后的链接
    Hit(ShortLink),
    /// 未命中（键不存在）
    Miss,
    /// 缓存后端不可用（连接失败 / 超时 / 反序列化失败）
    Unavailable,
}

/// TTL KV 后端。实现方自行记日志，put/delete 失败不向上传播。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, code: &str) -> CacheLookup;
    async fn put(&self, code: &str, link: &ShortLink, ttl: Duration);
    async fn delete(&self, code: &str);
}

/// Cache-aside 读层
pub struct LinkCache {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn LinkStore>,
    ttl: Duration,
}

impl LinkCache {
    pub fn new(store: Arc<dyn CacheStore>, source: Arc<dyn LinkStore>, ttl: Duration) -> Self {
        Self { store, source, ttl }
    }

    /// 读取链接：先探缓存，未命中回源并写回
    ///
    /// - 未命中且数据库也没有 → `Ok(None)`，且这个 miss 不缓存
    ///   （避免毒化刚创建的同名短码）
    /// - 缓存后端故障 → 直读数据库，跳过写回
    /// - 只有数据库读失败才返回 `Err`
    pub async fn get_link(&self, code: &str) -> Result<Option<ShortLink>> {
        match self.store.get(code).await {
            CacheLookup::Hit(link) => {
                trace!("Cache hit for code: {}", code);
                Ok(Some(link))
            }
            CacheLookup::Miss => {
                trace!("Cache miss for code: {}", code);
                match self.source.get_by_code(code).await? {
                    Some(link) => {
                        self.store.put(code, &link, self.ttl).await;
                        Ok(Some(link))
                    }
                    None => Ok(None),
                }
            }
            CacheLookup::Unavailable => {
                debug!("Cache unavailable for code {}, falling through to store", code);
                self.source.get_by_code(code).await
            }
        }
    }

    /// 无条件删除缓存条目。所有写路径在存储提交后必须调用；
    /// 短码重命名时旧码新码都要失效。
    pub async fn invalidate(&self, code: &str) {
        self.store.delete(code).await;
    }

    /// 创建后预热，避免首个重定向必然 miss
    pub async fn warm(&self, link: &ShortLink) {
        self.store.put(&link.short_code, link, self.ttl).await;
    }
}
