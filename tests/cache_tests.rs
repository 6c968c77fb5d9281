//! Cache-aside 读层集成测试
//!
//! 覆盖缓存一致性（写后失效必然回源）与缓存故障透明性
//! （后端全挂时读取仍然正确，且跳过写回）。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use hoplink::cache::{CacheLookup, CacheStore, LinkCache, MokaCacheStore};
use hoplink::errors::Result;
use hoplink::storage::{LinkStore, RedirectType, SecurityStatus, ShortLink};

/// 记录回源次数的假存储，内容可变以模拟 CRUD 写
struct CountingLinkStore {
    links: Mutex<HashMap<String, ShortLink>>,
    reads: AtomicUsize,
}

impl CountingLinkStore {
    fn new(links: Vec<ShortLink>) -> Self {
        Self {
            links: Mutex::new(
                links
                    .into_iter()
                    .map(|l| (l.short_code.clone(), l))
                    .collect(),
            ),
            reads: AtomicUsize::new(0),
        }
    }

    fn put(&self, link: ShortLink) {
        self.links.lock().insert(link.short_code.clone(), link);
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkStore for CountingLinkStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.links.lock().get(code).cloned())
    }
}

/// 一直报故障的缓存后端
#[derive(Default)]
struct BrokenCacheStore {
    puts: AtomicUsize,
}

#[async_trait]
impl CacheStore for BrokenCacheStore {
    async fn get(&self, _code: &str) -> CacheLookup {
        CacheLookup::Unavailable
    }

    async fn put(&self, _code: &str, _link: &ShortLink, _ttl: Duration) {
        self.puts.fetch_add(1, Ordering::SeqCst);
    }

    async fn delete(&self, _code: &str) {}
}

fn link(code: &str, target: &str) -> ShortLink {
    let now = Utc::now();
    ShortLink {
        id: 1,
        short_code: code.to_string(),
        original_url: Some(target.to_string()),
        encrypted_url: None,
        encryption_iv: None,
        is_encrypted: false,
        is_enabled: true,
        expires_at: None,
        password_hash: None,
        is_public: true,
        security_status: SecurityStatus::Secure,
        is_verified: false,
        redirect_type: RedirectType::TemporaryRedirect,
        visits: 0,
        created_at: now,
        updated_at: now,
    }
}

const TTL: Duration = Duration::from_secs(300);

#[tokio::test]
async fn test_miss_populates_then_hits() {
    let store = Arc::new(CountingLinkStore::new(vec![link("abc123", "https://a.example")]));
    let cache = LinkCache::new(Arc::new(MokaCacheStore::new(100)), store.clone(), TTL);

    // 首次 miss 回源
    let first = cache.get_link("abc123").await.unwrap().unwrap();
    assert_eq!(first.original_url.as_deref(), Some("https://a.example"));
    assert_eq!(store.reads(), 1);

    // 第二次命中缓存，不再回源
    let second = cache.get_link("abc123").await.unwrap().unwrap();
    assert_eq!(second.original_url.as_deref(), Some("https://a.example"));
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_invalidate_after_write_never_serves_stale() {
    let store = Arc::new(CountingLinkStore::new(vec![link("abc123", "https://old.example")]));
    let cache = LinkCache::new(Arc::new(MokaCacheStore::new(100)), store.clone(), TTL);

    // 预热旧值
    cache.get_link("abc123").await.unwrap();

    // CRUD 写层：先提交存储，再失效缓存
    store.put(link("abc123", "https://new.example"));
    cache.invalidate("abc123").await;

    // 失效后的读必然 miss 回源，拿到新值
    let reads_before = store.reads();
    let fresh = cache.get_link("abc123").await.unwrap().unwrap();
    assert_eq!(fresh.original_url.as_deref(), Some("https://new.example"));
    assert_eq!(store.reads(), reads_before + 1);
}

#[tokio::test]
async fn test_negative_result_is_not_cached() {
    let store = Arc::new(CountingLinkStore::new(vec![]));
    let cache = LinkCache::new(Arc::new(MokaCacheStore::new(100)), store.clone(), TTL);

    assert!(cache.get_link("soon").await.unwrap().is_none());
    assert_eq!(store.reads(), 1);

    // miss 不缓存：几秒后创建同名短码的场景不被毒化
    store.put(link("soon", "https://created.example"));
    let found = cache.get_link("soon").await.unwrap();
    assert_eq!(
        found.unwrap().original_url.as_deref(),
        Some("https://created.example")
    );
}

#[tokio::test]
async fn test_warm_avoids_first_miss() {
    let store = Arc::new(CountingLinkStore::new(vec![link("abc123", "https://a.example")]));
    let cache = LinkCache::new(Arc::new(MokaCacheStore::new(100)), store.clone(), TTL);

    cache.warm(&link("abc123", "https://a.example")).await;

    let got = cache.get_link("abc123").await.unwrap();
    assert!(got.is_some());
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_broken_cache_is_transparent() {
    let store = Arc::new(CountingLinkStore::new(vec![link("abc123", "https://a.example")]));
    let broken = Arc::new(BrokenCacheStore::default());
    let cache = LinkCache::new(broken.clone(), store.clone(), TTL);

    // 缓存全挂：数据照样正确
    let got = cache.get_link("abc123").await.unwrap().unwrap();
    assert_eq!(got.original_url.as_deref(), Some("https://a.example"));
    assert!(cache.get_link("missing").await.unwrap().is_none());

    // 每次都直读存储，且跳过写回
    assert_eq!(store.reads(), 2);
    assert_eq!(broken.puts.load(Ordering::SeqCst), 0);
}
