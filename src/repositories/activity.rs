use crate::common::context::Context;
use crate::common::redis_json::Json;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::Serialize;

pub const CHANNEL: &str = "matchstats:server_activity";

#[derive(Debug, Serialize)]
pub struct ActivityMessage<'a> {
    pub server_id: &'a str,
    pub active: bool,
    pub at: DateTime<Utc>,
}

pub async fn publish<C: Context>(ctx: &C, message: &ActivityMessage<'_>) -> anyhow::Result<()> {
    let mut redis = ctx.redis().await?;
    let _: () = redis.publish(CHANNEL, Json(message)).await?;
    Ok(())
}
