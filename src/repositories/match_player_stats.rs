use crate::common::context::Context;
use crate::entities::match_player_stats::{MatchPlayerStat, PlayerTotals, StatDelta};
use crate::models::matches::StatStatus;
use chrono::{DateTime, Utc};

const TABLE_NAME: &str = "match_player_stats";
const READ_FIELDS: &str = r#"
match_id, player_id, kills, assists, deaths, friendly_fire_kills,
objectives_captured, objectives_destroyed, score, total_play_time,
session_count, is_currently_connected, status, first_joined_at,
last_left_at, play_time_anchor, applied_offset"#;

// Seconds between the open session anchor and the bound timestamp.
// Assignments are evaluated left to right, so this must precede any reset of the anchor.
const ACCRUE_PLAY_TIME: &str = "total_play_time = total_play_time + IF(play_time_anchor IS NULL, 0, GREATEST(TIMESTAMPDIFF(SECOND, play_time_anchor, ?), 0))";

pub async fn fetch_one<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
) -> sqlx::Result<Option<MatchPlayerStat>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE match_id = ? AND player_id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(match_id)
        .bind(player_id)
        .fetch_optional(ctx.db())
        .await
}

pub async fn fetch_by_match<C: Context>(
    ctx: &C,
    match_id: i64,
) -> sqlx::Result<Vec<MatchPlayerStat>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE match_id = ? ORDER BY score DESC, kills DESC"
    );
    sqlx::query_as(QUERY)
        .bind(match_id)
        .fetch_all(ctx.db())
        .await
}

pub async fn add<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
    delta: &StatDelta,
    applied_offset: u64,
) -> sqlx::Result<()> {
    // applied_offset is assigned last so every IF still sees the stored value.
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        r#" (match_id, player_id, kills, assists, deaths, friendly_fire_kills,
        objectives_captured, objectives_destroyed, status, applied_offset)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'ongoing', ?)
        ON DUPLICATE KEY UPDATE
        kills = IF(VALUES(applied_offset) > applied_offset, kills + VALUES(kills), kills),
        assists = IF(VALUES(applied_offset) > applied_offset, assists + VALUES(assists), assists),
        deaths = IF(VALUES(applied_offset) > applied_offset, deaths + VALUES(deaths), deaths),
        friendly_fire_kills = IF(VALUES(applied_offset) > applied_offset,
            friendly_fire_kills + VALUES(friendly_fire_kills), friendly_fire_kills),
        objectives_captured = IF(VALUES(applied_offset) > applied_offset,
            objectives_captured + VALUES(objectives_captured), objectives_captured),
        objectives_destroyed = IF(VALUES(applied_offset) > applied_offset,
            objectives_destroyed + VALUES(objectives_destroyed), objectives_destroyed),
        applied_offset = GREATEST(applied_offset, VALUES(applied_offset))"#
    );
    sqlx::query(QUERY)
        .bind(match_id)
        .bind(player_id)
        .bind(delta.kills)
        .bind(delta.assists)
        .bind(delta.deaths)
        .bind(delta.friendly_fire_kills)
        .bind(delta.objectives_captured)
        .bind(delta.objectives_destroyed)
        .bind(applied_offset)
        .execute(ctx.db())
        .await?;
    Ok(())
}

pub async fn mark_connected<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
    at: DateTime<Utc>,
    applied_offset: u64,
) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        r#" (match_id, player_id, session_count, is_currently_connected, status,
        first_joined_at, play_time_anchor, applied_offset)
        VALUES (?, ?, 1, TRUE, 'ongoing', ?, ?, ?)
        ON DUPLICATE KEY UPDATE
        session_count = IF(VALUES(applied_offset) > applied_offset, session_count + 1, session_count),
        is_currently_connected = IF(VALUES(applied_offset) > applied_offset, TRUE, is_currently_connected),
        status = IF(VALUES(applied_offset) > applied_offset, 'ongoing', status),
        first_joined_at = COALESCE(first_joined_at, VALUES(first_joined_at)),
        play_time_anchor = IF(VALUES(applied_offset) > applied_offset,
            COALESCE(play_time_anchor, VALUES(play_time_anchor)), play_time_anchor),
        applied_offset = GREATEST(applied_offset, VALUES(applied_offset))"#
    );
    sqlx::query(QUERY)
        .bind(match_id)
        .bind(player_id)
        .bind(at)
        .bind(at)
        .bind(applied_offset)
        .execute(ctx.db())
        .await?;
    Ok(())
}

pub async fn mark_disconnected<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
    at: DateTime<Utc>,
    applied_offset: u64,
) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        " SET ",
        ACCRUE_PLAY_TIME,
        r#", play_time_anchor = NULL,
        is_currently_connected = FALSE,
        status = 'disconnected',
        last_left_at = ?,
        applied_offset = ?
        WHERE match_id = ? AND player_id = ? AND applied_offset < ?"#
    );
    sqlx::query(QUERY)
        .bind(at)
        .bind(at)
        .bind(applied_offset)
        .bind(match_id)
        .bind(player_id)
        .bind(applied_offset)
        .execute(ctx.db())
        .await?;
    Ok(())
}

pub async fn close_all<C: Context>(
    ctx: &C,
    match_id: i64,
    at: DateTime<Utc>,
    status: StatStatus,
) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        " SET ",
        ACCRUE_PLAY_TIME,
        r#", last_left_at = IF(is_currently_connected, ?, last_left_at),
        is_currently_connected = FALSE,
        play_time_anchor = NULL,
        status = ?
        WHERE match_id = ?"#
    );
    sqlx::query(QUERY)
        .bind(at)
        .bind(at)
        .bind(status.as_str())
        .bind(match_id)
        .execute(ctx.db())
        .await?;
    Ok(())
}

pub async fn reconcile_score<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
    score: i64,
    at: DateTime<Utc>,
) -> sqlx::Result<bool> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        " SET score = ?, ",
        ACCRUE_PLAY_TIME,
        r#", play_time_anchor = IF(play_time_anchor IS NULL OR play_time_anchor > ?, play_time_anchor, ?)
        WHERE match_id = ? AND player_id = ?"#
    );
    let query_result = sqlx::query(QUERY)
        .bind(score)
        .bind(at)
        .bind(at)
        .bind(at)
        .bind(match_id)
        .bind(player_id)
        .execute(ctx.db())
        .await?;
    Ok(query_result.rows_affected() > 0)
}

pub async fn fetch_totals<C: Context>(ctx: &C, player_id: i64) -> sqlx::Result<PlayerTotals> {
    const QUERY: &str = const_str::concat!(
        r#"SELECT CAST(COALESCE(SUM(kills), 0) AS SIGNED) AS kills,
        CAST(COALESCE(SUM(deaths), 0) AS SIGNED) AS deaths,
        CAST(COALESCE(SUM(assists), 0) AS SIGNED) AS assists,
        COUNT(*) AS matches FROM "#,
        TABLE_NAME,
        " WHERE player_id = ?"
    );
    sqlx::query_as(QUERY)
        .bind(player_id)
        .fetch_one(ctx.db())
        .await
}
