use crate::common::context::Context;
use crate::common::redis_pool::{PoolResult, RedisPool};
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Shared by every server worker; the store half is reached through [`crate::common::store::StatStore`].
#[derive(Clone)]
pub struct AppState {
    pub db: MySqlPool,
    pub redis: RedisPool,
}

#[async_trait]
impl Context for AppState {
    fn db(&self) -> &MySqlPool {
        &self.db
    }

    async fn redis(&self) -> PoolResult {
        self.redis.get().await
    }
}
