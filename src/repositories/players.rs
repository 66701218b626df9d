use crate::common::context::Context;
use crate::entities::players::Player;

const TABLE_NAME: &str = "players";
const READ_FIELDS: &str = "id, platform_id, name";

pub async fn fetch_one_by_platform_id<C: Context>(
    ctx: &C,
    platform_id: &str,
) -> sqlx::Result<Option<Player>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE platform_id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(platform_id)
        .fetch_optional(ctx.db())
        .await
}

pub async fn fetch_one<C: Context>(ctx: &C, player_id: i64) -> sqlx::Result<Option<Player>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(player_id)
        .fetch_optional(ctx.db())
        .await
}

/// Keeps the latest display name for a platform id.
pub async fn upsert<C: Context>(ctx: &C, platform_id: &str, name: &str) -> sqlx::Result<Player> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        " (platform_id, name) VALUES (?, ?)",
        " ON DUPLICATE KEY UPDATE name = VALUES(name)"
    );
    sqlx::query(QUERY)
        .bind(platform_id)
        .bind(name)
        .execute(ctx.db())
        .await?;
    fetch_one_by_platform_id(ctx, platform_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
