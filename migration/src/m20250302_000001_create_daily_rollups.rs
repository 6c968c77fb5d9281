//! 访问统计汇总表迁移
//!
//! 创建预聚合的天级汇总表，避免按原始事件扫描：
//! - daily_click_rollups: 每 (link, 天) 一行的点击计数
//! - daily_referrer_rollups: 按来源 host 分桶
//! - daily_geo_rollups: 按国家分桶

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. daily_click_rollups
        manager
            .create_table(
                Table::create()
                    .table(DailyClickRollup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyClickRollup::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyClickRollup::LinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyClickRollup::Day).date().not_null())
                    .col(
                        ColumnDef::new(DailyClickRollup::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 唯一索引：link_id + day（upsert 冲突目标）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_rollups_link_day")
                    .table(DailyClickRollup::Table)
                    .col(DailyClickRollup::LinkId)
                    .col(DailyClickRollup::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 2. daily_referrer_rollups
        manager
            .create_table(
                Table::create()
                    .table(DailyReferrerRollup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyReferrerRollup::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyReferrerRollup::LinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyReferrerRollup::Day).date().not_null())
                    .col(
                        ColumnDef::new(DailyReferrerRollup::Referrer)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyReferrerRollup::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referrer_rollups_link_day_ref")
                    .table(DailyReferrerRollup::Table)
                    .col(DailyReferrerRollup::LinkId)
                    .col(DailyReferrerRollup::Day)
                    .col(DailyReferrerRollup::Referrer)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 3. daily_geo_rollups
        manager
            .create_table(
                Table::create()
                    .table(DailyGeoRollup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyGeoRollup::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailyGeoRollup::LinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DailyGeoRollup::Day).date().not_null())
                    .col(
                        ColumnDef::new(DailyGeoRollup::Country)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyGeoRollup::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_geo_rollups_link_day_country")
                    .table(DailyGeoRollup::Table)
                    .col(DailyGeoRollup::LinkId)
                    .col(DailyGeoRollup::Day)
                    .col(DailyGeoRollup::Country)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyGeoRollup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyReferrerRollup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailyClickRollup::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum DailyClickRollup {
    #[sea_orm(iden = "daily_click_rollups")]
    Table,
    Id,
    LinkId,
    Day,
    Clicks,
}

#[derive(DeriveIden)]
enum DailyReferrerRollup {
    #[sea_orm(iden = "daily_referrer_rollups")]
    Table,
    Id,
    LinkId,
    Day,
    Referrer,
    Clicks,
}

#[derive(DeriveIden)]
enum DailyGeoRollup {
    #[sea_orm(iden = "daily_geo_rollups")]
    Table,
    Id,
    LinkId,
    Day,
    Country,
    Clicks,
}
