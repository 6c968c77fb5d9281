//! RollupSink implementation for SeaOrmStorage
//!
//! 把一个 (link, 天) 聚合分组写成四类原子操作：
//! - short_links.visits 原子累加
//! - daily_click_rollups 按 (link_id, day) increment-or-create
//! - daily_referrer_rollups 按 (link_id, day, referrer) increment-or-create
//! - daily_geo_rollups 按 (link_id, day, country) increment-or-create
//!
//! 所有 upsert 走存储层的 ON CONFLICT 累加（MySQL 为 VALUES() 形式），
//! 并发聚合器实例互相交叠时语义仍然正确。

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{ActiveValue::Set, ConnectionTrait, DatabaseBackend, EntityTrait, ExprTrait};
use tracing::debug;

use super::{SeaOrmStorage, retry};
use crate::analytics::{RollupSink, VisitAggregation};

use migration::entities::{daily_click_rollup, daily_geo_rollup, daily_referrer_rollup, short_link};

#[async_trait]
impl RollupSink for SeaOrmStorage {
    async fn apply_rollups(
        &self,
        link_id: i64,
        day: NaiveDate,
        aggregation: &VisitAggregation,
    ) -> anyhow::Result<()> {
        if aggregation.count == 0 {
            return Ok(());
        }

        self.increment_visits(link_id, aggregation.count).await?;
        self.upsert_click_rollup(link_id, day, aggregation.count)
            .await?;
        self.upsert_referrer_rollups(link_id, day, &aggregation.referrers)
            .await?;
        self.upsert_geo_rollups(link_id, day, &aggregation.countries)
            .await?;

        debug!(
            "Rollups applied for link {} on {}: {} clicks, {} referrer buckets, {} geo buckets",
            link_id,
            day,
            aggregation.count,
            aggregation.referrers.len(),
            aggregation.countries.len()
        );

        Ok(())
    }
}

impl SeaOrmStorage {
    /// visits = visits + n（原子，不走读-改-写）
    async fn increment_visits(&self, link_id: i64, count: usize) -> anyhow::Result<()> {
        let stmt = Query::update()
            .table(short_link::Entity)
            .value(
                short_link::Column::Visits,
                Expr::col(short_link::Column::Visits).add(Expr::val(count as i64)),
            )
            .and_where(Expr::col(short_link::Column::Id).eq(Expr::val(link_id)))
            .to_owned();

        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("rollup_increment_visits", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to increment visits: {}", e))?;

        Ok(())
    }

    async fn upsert_click_rollup(
        &self,
        link_id: i64,
        day: NaiveDate,
        count: usize,
    ) -> anyhow::Result<()> {
        let model = daily_click_rollup::ActiveModel {
            link_id: Set(link_id),
            day: Set(day),
            clicks: Set(count as i64),
            ..Default::default()
        };

        // SQLite/PostgreSQL: clicks = clicks + excluded.clicks
        // MySQL: clicks = clicks + VALUES(clicks)
        let on_conflict = match self.db.get_database_backend() {
            DatabaseBackend::MySql => OnConflict::columns([
                daily_click_rollup::Column::LinkId,
                daily_click_rollup::Column::Day,
            ])
            .value(
                daily_click_rollup::Column::Clicks,
                Expr::col(daily_click_rollup::Column::Clicks).add(Expr::cust("VALUES(clicks)")),
            )
            .to_owned(),
            _ => OnConflict::columns([
                daily_click_rollup::Column::LinkId,
                daily_click_rollup::Column::Day,
            ])
            .value(
                daily_click_rollup::Column::Clicks,
                Expr::col(daily_click_rollup::Column::Clicks).add(Expr::cust("excluded.clicks")),
            )
            .to_owned(),
        };

        retry::with_retry("rollup_upsert_clicks", self.retry_config, || async {
            daily_click_rollup::Entity::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec(&self.db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upsert click rollup: {}", e))?;

        Ok(())
    }

    async fn upsert_referrer_rollups(
        &self,
        link_id: i64,
        day: NaiveDate,
        referrers: &std::collections::HashMap<String, usize>,
    ) -> anyhow::Result<()> {
        if referrers.is_empty() {
            return Ok(());
        }

        let models: Vec<daily_referrer_rollup::ActiveModel> = referrers
            .iter()
            .map(|(referrer, count)| daily_referrer_rollup::ActiveModel {
                link_id: Set(link_id),
                day: Set(day),
                referrer: Set(referrer.clone()),
                clicks: Set(*count as i64),
                ..Default::default()
            })
            .collect();

        let on_conflict = match self.db.get_database_backend() {
            DatabaseBackend::MySql => OnConflict::columns([
                daily_referrer_rollup::Column::LinkId,
                daily_referrer_rollup::Column::Day,
                daily_referrer_rollup::Column::Referrer,
            ])
            .value(
                daily_referrer_rollup::Column::Clicks,
                Expr::col(daily_referrer_rollup::Column::Clicks).add(Expr::cust("VALUES(clicks)")),
            )
            .to_owned(),
            _ => OnConflict::columns([
                daily_referrer_rollup::Column::LinkId,
                daily_referrer_rollup::Column::Day,
                daily_referrer_rollup::Column::Referrer,
            ])
            .value(
                daily_referrer_rollup::Column::Clicks,
                Expr::col(daily_referrer_rollup::Column::Clicks).add(Expr::cust("excluded.clicks")),
            )
            .to_owned(),
        };

        retry::with_retry("rollup_upsert_referrers", self.retry_config, || async {
            daily_referrer_rollup::Entity::insert_many(models.clone())
                .on_conflict(on_conflict.clone())
                .exec(&self.db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upsert referrer rollups: {}", e))?;

        Ok(())
    }

    async fn upsert_geo_rollups(
        &self,
        link_id: i64,
        day: NaiveDate,
        countries: &std::collections::HashMap<String, usize>,
    ) -> anyhow::Result<()> {
        if countries.is_empty() {
            return Ok(());
        }

        let models: Vec<daily_geo_rollup::ActiveModel> = countries
            .iter()
            .map(|(country, count)| daily_geo_rollup::ActiveModel {
                link_id: Set(link_id),
                day: Set(day),
                country: Set(country.clone()),
                clicks: Set(*count as i64),
                ..Default::default()
            })
            .collect();

        let on_conflict = match self.db.get_database_backend() {
            DatabaseBackend::MySql => OnConflict::columns([
                daily_geo_rollup::Column::LinkId,
                daily_geo_rollup::Column::Day,
                daily_geo_rollup::Column::Country,
            ])
            .value(
                daily_geo_rollup::Column::Clicks,
                Expr::col(daily_geo_rollup::Column::Clicks).add(Expr::cust("VALUES(clicks)")),
            )
            .to_owned(),
            _ => OnConflict::columns([
                daily_geo_rollup::Column::LinkId,
                daily_geo_rollup::Column::Day,
                daily_geo_rollup::Column::Country,
            ])
            .value(
                daily_geo_rollup::Column::Clicks,
                Expr::col(daily_geo_rollup::Column::Clicks).add(Expr::cust("excluded.clicks")),
            )
            .to_owned(),
        };

        retry::with_retry("rollup_upsert_geo", self.retry_config, || async {
            daily_geo_rollup::Entity::insert_many(models.clone())
                .on_conflict(on_conflict.clone())
                .exec(&self.db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upsert geo rollups: {}", e))?;

        Ok(())
    }
}
