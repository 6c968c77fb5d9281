//! SQLite 后端集成测试
//!
//! 用临时文件数据库跑完整迁移，覆盖 CRUD、重命名唯一性、
//! 汇总 upsert 的累加语义，以及队列→聚合器→存储的端到端场景。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tempfile::TempDir;

use hoplink::analytics::{
    MemoryVisitQueue, REFERRER_DIRECT, RollupSink, VisitAggregation, VisitAggregator, VisitEvent,
    VisitQueue,
};
use hoplink::cache::{LinkCache, MokaCacheStore};
use hoplink::errors::HoplinkError;
use hoplink::services::{LinkService, NewLink, UpdateLink};
use hoplink::storage::backend::retry::RetryConfig;
use hoplink::storage::{RedirectType, SeaOrmStorage, SecurityStatus, ShortLink};

async fn make_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("hoplink_test.db");
    let url = format!("sqlite://{}", db_path.display());

    let storage = SeaOrmStorage::new(&url, 5, RetryConfig::default())
        .await
        .expect("storage should initialize and migrate");

    (Arc::new(storage), dir)
}

fn sample_link(code: &str) -> ShortLink {
    let now = Utc::now();
    ShortLink {
        id: 0,
        short_code: code.to_string(),
        original_url: Some("https://example.com".to_string()),
        encrypted_url: None,
        encryption_iv: None,
        is_encrypted: false,
        is_enabled: true,
        expires_at: Some(now + ChronoDuration::days(7)),
        password_hash: None,
        is_public: true,
        security_status: SecurityStatus::Secure,
        is_verified: false,
        redirect_type: RedirectType::PermanentRedirect,
        visits: 0,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_insert_and_find_round_trip() {
    let (storage, _dir) = make_storage().await;

    let created = storage.insert(sample_link("abc123")).await.unwrap();
    assert!(created.id > 0);

    let found = storage.find_by_code("abc123").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.original_url.as_deref(), Some("https://example.com"));
    assert_eq!(found.security_status, SecurityStatus::Secure);
    assert_eq!(found.redirect_type, RedirectType::PermanentRedirect);
    assert_eq!(found.visits, 0);

    assert!(storage.find_by_code("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_code_is_a_conflict() {
    let (storage, _dir) = make_storage().await;

    storage.insert(sample_link("dup")).await.unwrap();
    let err = storage.insert(sample_link("dup")).await.unwrap_err();
    assert!(matches!(err, HoplinkError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_rename_rechecks_uniqueness() {
    let (storage, _dir) = make_storage().await;

    let a = storage.insert(sample_link("aaa")).await.unwrap();
    storage.insert(sample_link("bbb")).await.unwrap();

    // 撞已有短码：冲突
    let err = storage.rename(a.id, "bbb").await.unwrap_err();
    assert!(matches!(err, HoplinkError::Conflict(_)));

    // 换成空闲短码：成功，旧码消失
    storage.rename(a.id, "ccc").await.unwrap();
    assert!(storage.find_by_code("aaa").await.unwrap().is_none());
    let renamed = storage.find_by_code("ccc").await.unwrap().unwrap();
    assert_eq!(renamed.id, a.id);
}

#[tokio::test]
async fn test_rollup_upserts_accumulate() {
    let (storage, _dir) = make_storage().await;
    let created = storage.insert(sample_link("roll")).await.unwrap();
    let day = Utc::now().date_naive();

    let mut agg = VisitAggregation::default();
    agg.count = 2;
    agg.referrers = HashMap::from([(REFERRER_DIRECT.to_string(), 2)]);
    agg.countries = HashMap::from([("US".to_string(), 2)]);

    // 第一趟建行，第二趟走 ON CONFLICT 原子累加
    storage.apply_rollups(created.id, day, &agg).await.unwrap();
    storage.apply_rollups(created.id, day, &agg).await.unwrap();

    assert_eq!(storage.click_rollup(created.id, day).await.unwrap(), Some(4));
    assert_eq!(
        storage
            .referrer_rollup(created.id, day, REFERRER_DIRECT)
            .await
            .unwrap(),
        Some(4)
    );
    assert_eq!(
        storage.geo_rollup(created.id, day, "US").await.unwrap(),
        Some(4)
    );

    let link = storage.find_by_code("roll").await.unwrap().unwrap();
    assert_eq!(link.visits, 4);
}

#[tokio::test]
async fn test_aggregation_scenario_end_to_end() {
    // 规格场景：3 个事件（Direct/Direct/google.com, US/US/DE）
    let (storage, _dir) = make_storage().await;
    let created = storage.insert(sample_link("agg")).await.unwrap();

    let queue = Arc::new(MemoryVisitQueue::new());
    for (referrer, country) in [
        (REFERRER_DIRECT, "US"),
        (REFERRER_DIRECT, "US"),
        ("google.com", "DE"),
    ] {
        queue
            .enqueue(VisitEvent {
                link_id: created.id,
                referrer_host: referrer.to_string(),
                country_code: country.to_string(),
                occurred_at: Utc::now(),
            })
            .await;
    }

    let aggregator = VisitAggregator::new(queue.clone(), storage.clone());
    let report = aggregator.run_batch(10).await;
    assert_eq!(report.processed, 3);
    assert_eq!(report.links_affected, 1);
    assert_eq!(report.queue_length_after, 0);

    let day = Utc::now().date_naive();
    assert_eq!(storage.click_rollup(created.id, day).await.unwrap(), Some(3));
    assert_eq!(
        storage
            .referrer_rollup(created.id, day, REFERRER_DIRECT)
            .await
            .unwrap(),
        Some(2)
    );
    assert_eq!(
        storage
            .referrer_rollup(created.id, day, "google.com")
            .await
            .unwrap(),
        Some(1)
    );
    assert_eq!(
        storage.geo_rollup(created.id, day, "US").await.unwrap(),
        Some(2)
    );
    assert_eq!(
        storage.geo_rollup(created.id, day, "DE").await.unwrap(),
        Some(1)
    );

    let link = storage.find_by_code("agg").await.unwrap().unwrap();
    assert_eq!(link.visits, 3);
}

#[tokio::test]
async fn test_delete_purges_rollups() {
    let (storage, _dir) = make_storage().await;
    let created = storage.insert(sample_link("gone")).await.unwrap();
    let day = Utc::now().date_naive();

    let mut agg = VisitAggregation::default();
    agg.count = 1;
    agg.referrers = HashMap::from([(REFERRER_DIRECT.to_string(), 1)]);
    agg.countries = HashMap::from([("US".to_string(), 1)]);
    storage.apply_rollups(created.id, day, &agg).await.unwrap();

    storage.delete(created.id).await.unwrap();

    assert!(storage.find_by_code("gone").await.unwrap().is_none());
    assert_eq!(storage.click_rollup(created.id, day).await.unwrap(), None);
    assert_eq!(
        storage
            .referrer_rollup(created.id, day, REFERRER_DIRECT)
            .await
            .unwrap(),
        None
    );
    assert_eq!(storage.geo_rollup(created.id, day, "US").await.unwrap(), None);
}

#[tokio::test]
async fn test_link_service_invalidates_cache_after_write() {
    let (storage, _dir) = make_storage().await;
    let cache = Arc::new(LinkCache::new(
        Arc::new(MokaCacheStore::new(100)),
        storage.clone(),
        Duration::from_secs(300),
    ));
    let service = LinkService::new(storage.clone(), cache.clone());

    let created = service
        .create(NewLink {
            short_code: Some("svc1".to_string()),
            original_url: Some("https://old.example".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(created.id > 0);

    // create 之后缓存已预热
    let cached = cache.get_link("svc1").await.unwrap().unwrap();
    assert_eq!(cached.original_url.as_deref(), Some("https://old.example"));

    // 写后读不到旧值
    service
        .update(
            "svc1",
            UpdateLink {
                original_url: Some("https://new.example".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fresh = cache.get_link("svc1").await.unwrap().unwrap();
    assert_eq!(fresh.original_url.as_deref(), Some("https://new.example"));
}

#[tokio::test]
async fn test_link_service_rename_invalidates_both_codes() {
    let (storage, _dir) = make_storage().await;
    let cache = Arc::new(LinkCache::new(
        Arc::new(MokaCacheStore::new(100)),
        storage.clone(),
        Duration::from_secs(300),
    ));
    let service = LinkService::new(storage.clone(), cache.clone());

    service
        .create(NewLink {
            short_code: Some("before".to_string()),
            original_url: Some("https://example.com".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    cache.get_link("before").await.unwrap();

    let renamed = service.rename("before", "after").await.unwrap();
    assert_eq!(renamed.short_code, "after");

    // 旧码立即失效，新码可解析
    assert!(cache.get_link("before").await.unwrap().is_none());
    assert!(cache.get_link("after").await.unwrap().is_some());
}

#[tokio::test]
async fn test_password_and_public_are_mutually_exclusive() {
    let (storage, _dir) = make_storage().await;
    let cache = Arc::new(LinkCache::new(
        Arc::new(MokaCacheStore::new(100)),
        storage.clone(),
        Duration::from_secs(300),
    ));
    let service = LinkService::new(storage, cache);

    let err = service
        .create(NewLink {
            short_code: Some("locked".to_string()),
            original_url: Some("https://example.com".to_string()),
            password: Some("hunter2".to_string()),
            is_public: true,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HoplinkError::Validation(_)));
}
