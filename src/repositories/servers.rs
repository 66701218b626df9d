use crate::common::context::Context;
use crate::entities::servers::{Server, UpsertServerArgs};
use chrono::{DateTime, Utc};

const TABLE_NAME: &str = "servers";
const READ_FIELDS: &str = "id, external_id, name, log_path, log_offset, log_base, log_opened_at";

pub async fn fetch_one_by_external_id<C: Context>(
    ctx: &C,
    external_id: &str,
) -> sqlx::Result<Server> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE external_id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(external_id)
        .fetch_one(ctx.db())
        .await
}

/// Creates the server on first observation, otherwise refreshes name and path.
pub async fn upsert<C: Context>(ctx: &C, args: &UpsertServerArgs<'_>) -> sqlx::Result<Server> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        " (external_id, name, log_path) VALUES (?, ?, ?)",
        " ON DUPLICATE KEY UPDATE name = VALUES(name), log_path = VALUES(log_path)"
    );
    sqlx::query(QUERY)
        .bind(args.external_id)
        .bind(args.name)
        .bind(args.log_path)
        .execute(ctx.db())
        .await?;
    fetch_one_by_external_id(ctx, args.external_id).await
}

pub async fn save_log_position<C: Context>(
    ctx: &C,
    server_id: i64,
    log_base: u64,
    offset: u64,
    opened_at: Option<DateTime<Utc>>,
) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        " SET log_base = ?, log_offset = ?, log_opened_at = ? WHERE id = ?"
    );
    sqlx::query(QUERY)
        .bind(log_base)
        .bind(offset)
        .bind(opened_at)
        .bind(server_id)
        .execute(ctx.db())
        .await?;
    Ok(())
}
