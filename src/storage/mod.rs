//! 存储层：领域模型 + SeaORM 后端
//!
//! `LinkStore` 是解析热路径依赖的最小读接口，便于测试时注入假实现；
//! 写路径（LinkService）直接使用 `SeaOrmStorage` 的具体方法。

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{RedirectType, SecurityStatus, ShortLink};

use async_trait::async_trait;

use crate::errors::Result;

/// 按唯一短码读取链接的最小接口（Link Cache 的回源）
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>>;
}
