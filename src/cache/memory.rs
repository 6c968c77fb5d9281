use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::debug;

use super::{CacheLookup, CacheStore};
use crate::storage::ShortLink;

/// 条目按写入时传入的 TTL 过期；不会晚于链接自身的 expires_at
struct LinkEntryExpiry;

impl Expiry<String, (ShortLink, Duration)> for LinkEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(ShortLink, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        let (link, ttl) = value;
        match link.expires_at {
            Some(expires_at) => {
                let now = chrono::Utc::now();
                if expires_at <= now {
                    Some(Duration::from_secs(1))
                } else {
                    let remaining = (expires_at - now).num_seconds().max(1) as u64;
                    Some(Duration::from_secs(remaining).min(*ttl))
                }
            }
            None => Some(*ttl),
        }
    }
}

/// 进程内 TTL 缓存（单机部署与测试用）
pub struct MokaCacheStore {
    inner: Cache<String, (ShortLink, Duration)>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(LinkEntryExpiry)
            .build();

        debug!("MokaCacheStore initialized with max capacity: {}", max_capacity);
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, code: &str) -> CacheLookup {
        match self.inner.get(code).await {
            Some((link, _)) => CacheLookup::Hit(link),
            None => CacheLookup::Miss,
        }
    }

    async fn put(&self, code: &str, link: &ShortLink, ttl: Duration) {
        self.inner
            .insert(code.to_string(), (link.clone(), ttl))
            .await;
    }

    async fn delete(&self, code: &str) {
        self.inner.invalidate(code).await;
    }
}
