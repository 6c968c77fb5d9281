use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "short_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub short_code: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub original_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub encrypted_url: Option<String>,
    pub encryption_iv: Option<String>,
    pub is_encrypted: bool,
    pub is_enabled: bool,
    pub expires_at: Option<DateTimeUtc>,
    pub password_hash: Option<String>,
    pub is_public: bool,
    pub security_status: String,
    pub is_verified: bool,
    pub redirect_type: i16,
    pub visits: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
