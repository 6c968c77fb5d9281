use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use tracing::{info, warn};

use hoplink::analytics::{
    MemoryVisitQueue, RedisVisitQueue, RollupSink, VisitAggregator, VisitQueue,
};
use hoplink::api::{VerificationTokenService, redirect_routes, verify_routes};
use hoplink::cache::{CacheStore, LinkCache, MokaCacheStore, RedisCacheStore};
use hoplink::config::{StaticConfig, get_config, init_config};
use hoplink::limiter::{MemorySlidingWindow, RateLimiter, RedisSlidingWindow};
use hoplink::logging::init_logging;
use hoplink::resolver::{RedirectResolver, ResolverPolicy};
use hoplink::storage::backend::retry::RetryConfig;
use hoplink::storage::{LinkStore, SeaOrmStorage};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_config();
    let config = get_config();

    let _log_guard = init_logging(&config.logging);

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    // 存储后端 + 迁移
    let retry_config = RetryConfig {
        max_retries: config.database.retry_count,
        base_delay_ms: config.database.retry_base_delay_ms,
        max_delay_ms: config.database.retry_max_delay_ms,
    };
    let storage = Arc::new(
        SeaOrmStorage::new(
            &config.database.database_url,
            config.database.pool_size,
            retry_config,
        )
        .await
        .context("Failed to initialize storage backend")?,
    );
    info!("Storage backend ready: {}", storage.backend_name());

    // 共享 Redis 客户端：进程启动时构造一次，显式注入各组件
    let (cache_store, rate_limiter, visit_queue) = build_shared_stores(&config)?;

    let link_cache = Arc::new(LinkCache::new(
        cache_store,
        Arc::clone(&storage) as Arc<dyn LinkStore>,
        Duration::from_secs(config.cache.default_ttl),
    ));

    let resolver = Arc::new(RedirectResolver::new(
        Arc::clone(&link_cache),
        Arc::clone(&rate_limiter),
        Arc::clone(&visit_queue),
        ResolverPolicy {
            redirect_limit: config.limits.redirect_per_window,
            window: Duration::from_secs(config.limits.window_secs),
            decrypt_page: config.pages.decrypt.clone(),
        },
    ));

    let jwt_secret = if config.auth.jwt_secret.is_empty() {
        warn!("JWT secret not configured, generating a random one (verification cookies will not survive restarts)");
        hoplink::utils::generate_random_code(48)
    } else {
        config.auth.jwt_secret.clone()
    };
    let tokens = Arc::new(VerificationTokenService::new(
        &jwt_secret,
        config.auth.verify_token_minutes,
    ));

    // 聚合器后台任务（进程内调度；外部调度器也可直接调 run_batch）
    let aggregator = Arc::new(VisitAggregator::new(
        Arc::clone(&visit_queue),
        Arc::clone(&storage) as Arc<dyn RollupSink>,
    ));
    {
        let aggregator = Arc::clone(&aggregator);
        let interval = Duration::from_secs(config.analytics.flush_interval_secs);
        let batch_size = config.analytics.batch_size;
        tokio::spawn(async move {
            aggregator.start_background_task(interval, batch_size).await;
        });
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server at http://{}", bind_address);

    let workers = config.server.cpu_count;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&resolver)))
            .app_data(web::Data::new(Arc::clone(&link_cache)))
            .app_data(web::Data::new(Arc::clone(&rate_limiter)))
            .app_data(web::Data::new(Arc::clone(&tokens)))
            .service(verify_routes())
            .service(redirect_routes())
    })
    .workers(workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    Ok(())
}

/// 构造缓存 / 限流 / 队列三个共享存储
///
/// cache.type = "redis" 时三者共用同一个 redis::Client；
/// "memory" 时全部使用进程内实现（单机部署）。
#[allow(clippy::type_complexity)]
fn build_shared_stores(
    config: &StaticConfig,
) -> Result<(Arc<dyn CacheStore>, Arc<dyn RateLimiter>, Arc<dyn VisitQueue>)> {
    if config.cache.cache_type == "redis" {
        let client = redis::Client::open(config.cache.redis.url.clone())
            .context("Failed to create Redis client")?;
        let prefix = &config.cache.redis.key_prefix;

        let cache: Arc<dyn CacheStore> = Arc::new(RedisCacheStore::new(
            client.clone(),
            format!("{}link:", prefix),
        ));
        let limiter: Arc<dyn RateLimiter> = Arc::new(RedisSlidingWindow::new(
            client.clone(),
            format!("{}rl:", prefix),
            Duration::from_millis(config.limits.check_timeout_ms),
        ));
        let queue: Arc<dyn VisitQueue> = Arc::new(RedisVisitQueue::new(
            client,
            config.analytics.queue_key.clone(),
            Duration::from_millis(config.analytics.enqueue_timeout_ms),
        ));

        info!("Shared stores backed by Redis at {}", config.cache.redis.url);
        Ok((cache, limiter, queue))
    } else {
        info!("Shared stores running in-process (single instance mode)");
        let cache: Arc<dyn CacheStore> =
            Arc::new(MokaCacheStore::new(config.cache.memory.max_capacity));
        let limiter: Arc<dyn RateLimiter> = Arc::new(MemorySlidingWindow::new());
        let queue: Arc<dyn VisitQueue> = Arc::new(MemoryVisitQueue::new());
        Ok((cache, limiter, queue))
    }
}
