//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::error;

use super::converters::model_to_shortlink;
use super::{SeaOrmStorage, retry};
use crate::errors::{HoplinkError, Result};
use crate::storage::{LinkStore, ShortLink};

use migration::entities::{daily_click_rollup, daily_geo_rollup, daily_referrer_rollup, short_link};

impl SeaOrmStorage {
    /// 按唯一短码查询
    pub async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let code_owned = code.to_string();

        let result = retry::with_retry(
            &format!("find_by_code({})", code),
            self.retry_config,
            || async {
                short_link::Entity::find()
                    .filter(short_link::Column::ShortCode.eq(code_owned.clone()))
                    .one(db)
                    .await
            },
        )
        .await;

        match result {
            Ok(model) => Ok(model.map(model_to_shortlink)),
            Err(e) => {
                error!("查询短链接失败（重试后仍失败）: {}", e);
                Err(HoplinkError::database_operation(e.to_string()))
            }
        }
    }

    /// 按内部 id 查询
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
        let db = &self.db;

        let result = retry::with_retry(
            &format!("find_by_id({})", id),
            self.retry_config,
            || async { short_link::Entity::find_by_id(id).one(db).await },
        )
        .await
        .map_err(|e| HoplinkError::database_operation(e.to_string()))?;

        Ok(result.map(model_to_shortlink))
    }

    /// 读取某 (link, 天) 的点击汇总行（观测 / 测试用）
    pub async fn click_rollup(&self, link_id: i64, day: NaiveDate) -> Result<Option<i64>> {
        let row = daily_click_rollup::Entity::find()
            .filter(daily_click_rollup::Column::LinkId.eq(link_id))
            .filter(daily_click_rollup::Column::Day.eq(day))
            .one(&self.db)
            .await?;

        Ok(row.map(|r| r.clicks))
    }

    /// 读取某 (link, 天, referrer) 的来源汇总
    pub async fn referrer_rollup(
        &self,
        link_id: i64,
        day: NaiveDate,
        referrer: &str,
    ) -> Result<Option<i64>> {
        let row = daily_referrer_rollup::Entity::find()
            .filter(daily_referrer_rollup::Column::LinkId.eq(link_id))
            .filter(daily_referrer_rollup::Column::Day.eq(day))
            .filter(daily_referrer_rollup::Column::Referrer.eq(referrer))
            .one(&self.db)
            .await?;

        Ok(row.map(|r| r.clicks))
    }

    /// 读取某 (link, 天, country) 的地理汇总
    pub async fn geo_rollup(
        &self,
        link_id: i64,
        day: NaiveDate,
        country: &str,
    ) -> Result<Option<i64>> {
        let row = daily_geo_rollup::Entity::find()
            .filter(daily_geo_rollup::Column::LinkId.eq(link_id))
            .filter(daily_geo_rollup::Column::Day.eq(day))
            .filter(daily_geo_rollup::Column::Country.eq(country))
            .one(&self.db)
            .await?;

        Ok(row.map(|r| r.clicks))
    }
}

#[async_trait]
impl LinkStore for SeaOrmStorage {
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        self.find_by_code(code).await
    }
}
