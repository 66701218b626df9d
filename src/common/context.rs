use crate::common::redis_pool::PoolResult;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Connections the MySQL repositories and the redis publishers run on.
#[async_trait]
pub trait Context: Sync + Send {
    fn db(&self) -> &MySqlPool;
    async fn redis(&self) -> PoolResult;
}
