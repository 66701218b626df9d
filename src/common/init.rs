use crate::common::redis_pool::{RedisPool, RedisPoolManager};
use crate::common::state::AppState;
use crate::settings::AppSettings;
use deadpool::Runtime;
use redis::{AsyncConnectionConfig, Commands};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Instant;
use tracing::info;

pub fn initialize_logging(settings: &AppSettings) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(settings.level)
        .with_timer(tracing_subscriber::fmt::time())
        .with_level(true);
    if settings.log_json {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }
}

pub async fn initialize_state(settings: &AppSettings) -> anyhow::Result<AppState> {
    let started = Instant::now();
    let db = initialize_db(settings).await?;
    let redis = initialize_redis(settings)?;
    info!(
        component = %settings.app_component,
        "Connected to MySQL and redis in {:?}",
        started.elapsed()
    );
    Ok(AppState { db, redis })
}

pub async fn initialize_db(settings: &AppSettings) -> sqlx::Result<MySqlPool> {
    MySqlPoolOptions::new()
        .acquire_timeout(settings.db_wait_timeout)
        .max_connections(settings.db_max_connections as _)
        .connect(&settings.database_url)
        .await
}

/// Fails fast on an unreachable redis instead of on the first activity edge.
pub fn initialize_redis(settings: &AppSettings) -> anyhow::Result<RedisPool> {
    let client = redis::Client::open(settings.redis_url.as_str())?;
    let _: () = client
        .get_connection_with_timeout(settings.redis_connection_timeout)?
        .ping()?;

    let config = AsyncConnectionConfig::new()
        .set_connection_timeout(settings.redis_connection_timeout)
        .set_response_timeout(settings.redis_response_timeout);
    let pool = RedisPool::builder(RedisPoolManager::new(client, config))
        .max_size(settings.redis_max_connections)
        .wait_timeout(Some(settings.redis_wait_timeout))
        .runtime(Runtime::Tokio1)
        .build()?;
    Ok(pool)
}
