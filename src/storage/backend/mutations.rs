//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write database operations. Cache invalidation
//! is NOT done here; the write layer (LinkService) owns that contract.

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::info;

use super::converters::{model_to_shortlink, shortlink_to_active_model};
use super::{SeaOrmStorage, retry};
use crate::errors::{HoplinkError, Result};
use crate::storage::ShortLink;

use migration::entities::{daily_click_rollup, daily_geo_rollup, daily_referrer_rollup, short_link};

impl SeaOrmStorage {
    /// 插入新链接，返回带数据库分配 id 的完整记录
    pub async fn insert(&self, link: ShortLink) -> Result<ShortLink> {
        let db = &self.db;
        let active = shortlink_to_active_model(&link, true);

        let result = retry::with_retry(
            &format!("insert({})", link.short_code),
            self.retry_config,
            || async { short_link::Entity::insert(active.clone()).exec(db).await },
        )
        .await
        .map_err(|e| {
            // 唯一索引冲突按冲突上报，其余按操作失败
            let msg = e.to_string();
            if msg.to_lowercase().contains("unique") {
                HoplinkError::conflict(format!("短码已存在: {}", link.short_code))
            } else {
                HoplinkError::database_operation(format!("插入短链接失败: {}", msg))
            }
        })?;

        info!("Short link created: {}", link.short_code);
        Ok(ShortLink {
            id: result.last_insert_id,
            ..link
        })
    }

    /// 按 id 更新可变字段（不触碰 visits / created_at）
    pub async fn update(&self, link: &ShortLink) -> Result<()> {
        let db = &self.db;
        let mut active = shortlink_to_active_model(link, false);
        active.updated_at = sea_orm::ActiveValue::Set(Utc::now());

        retry::with_retry(
            &format!("update({})", link.short_code),
            self.retry_config,
            || async {
                short_link::Entity::update(active.clone())
                    .exec(db)
                    .await
                    .map(|_| ())
            },
        )
        .await
        .map_err(|e| HoplinkError::database_operation(format!("更新短链接失败: {}", e)))?;

        Ok(())
    }

    /// 重命名短码
    ///
    /// 在事务内重查新短码的唯一性后再写入；并发竞争下由唯一索引兜底。
    pub async fn rename(&self, id: i64, new_code: &str) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| HoplinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let taken = short_link::Entity::find()
            .filter(short_link::Column::ShortCode.eq(new_code))
            .one(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("查询失败: {}", e)))?;

        if let Some(existing) = taken {
            if existing.id != id {
                return Err(HoplinkError::conflict(format!("短码已存在: {}", new_code)));
            }
        }

        let existing = short_link::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("查询失败: {}", e)))?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: id={}", id)))?;

        let mut active: short_link::ActiveModel = existing.into();
        active.short_code = sea_orm::ActiveValue::Set(new_code.to_string());
        active.updated_at = sea_orm::ActiveValue::Set(Utc::now());

        short_link::Entity::update(active)
            .exec(&txn)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("unique") {
                    HoplinkError::conflict(format!("短码已存在: {}", new_code))
                } else {
                    HoplinkError::database_operation(format!("重命名失败: {}", msg))
                }
            })?;

        txn.commit()
            .await
            .map_err(|e| HoplinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!("Short link renamed: id={} -> {}", id, new_code);
        Ok(())
    }

    /// 删除链接及其全部汇总行
    pub async fn delete(&self, id: i64) -> Result<ShortLink> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| HoplinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let existing = short_link::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("查询失败: {}", e)))?
            .ok_or_else(|| HoplinkError::not_found(format!("短链接不存在: id={}", id)))?;

        // 先清依赖的汇总行，再删主记录
        daily_click_rollup::Entity::delete_many()
            .filter(daily_click_rollup::Column::LinkId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("删除点击汇总失败: {}", e)))?;

        daily_referrer_rollup::Entity::delete_many()
            .filter(daily_referrer_rollup::Column::LinkId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("删除来源汇总失败: {}", e)))?;

        daily_geo_rollup::Entity::delete_many()
            .filter(daily_geo_rollup::Column::LinkId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("删除地理汇总失败: {}", e)))?;

        short_link::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| HoplinkError::database_operation(format!("删除短链接失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| HoplinkError::database_operation(format!("提交事务失败: {}", e)))?;

        let link = model_to_shortlink(existing);
        info!("Short link deleted: {}", link.short_code);
        Ok(link)
    }
}
