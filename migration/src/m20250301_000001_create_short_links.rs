use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 short_links 表
        manager
            .create_table(
                Table::create()
                    .table(ShortLink::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortLink::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShortLink::ShortCode)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShortLink::OriginalUrl).text().null())
                    .col(ColumnDef::new(ShortLink::EncryptedUrl).text().null())
                    .col(
                        ColumnDef::new(ShortLink::EncryptionIv)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShortLink::IsEncrypted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ShortLink::IsEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ShortLink::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ShortLink::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(ShortLink::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ShortLink::SecurityStatus)
                            .string_len(16)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(ShortLink::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ShortLink::RedirectType)
                            .small_integer()
                            .not_null()
                            .default(307),
                    )
                    .col(
                        ColumnDef::new(ShortLink::Visits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ShortLink::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortLink::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 短码唯一索引（解析热路径按 short_code 查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_code")
                    .table(ShortLink::Table)
                    .col(ShortLink::ShortCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 过期时间索引（清理任务用）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_expires_at")
                    .table(ShortLink::Table)
                    .col(ShortLink::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_short_links_expires_at").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_short_links_code").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ShortLink::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ShortLink {
    #[sea_orm(iden = "short_links")]
    Table,
    Id,
    ShortCode,
    OriginalUrl,
    EncryptedUrl,
    EncryptionIv,
    IsEncrypted,
    IsEnabled,
    ExpiresAt,
    PasswordHash,
    IsPublic,
    SecurityStatus,
    IsVerified,
    RedirectType,
    Visits,
    CreatedAt,
    UpdatedAt,
}
