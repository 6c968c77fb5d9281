//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;
mod rollup_sink;

use sea_orm::DatabaseConnection;

use crate::errors::Result;

pub use connection::{connect_generic, connect_sqlite, infer_backend_from_url, run_migrations};
pub use converters::{model_to_shortlink, shortlink_to_active_model};

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 重试配置
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(
        database_url: &str,
        pool_size: u32,
        retry_config: retry::RetryConfig,
    ) -> Result<Self> {
        if database_url.is_empty() {
            return Err(crate::errors::HoplinkError::database_config(
                "DATABASE_URL 未设置".to_string(),
            ));
        }

        let backend_name = infer_backend_from_url(database_url)?;

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, &backend_name, pool_size).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retry_config,
        };

        run_migrations(&storage.db).await?;

        Ok(storage)
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
