use crate::common::context::Context;
use crate::entities::matches::{CreateMatchArgs, Match};
use crate::models::matches::MatchStatus;

const TABLE_NAME: &str = "matches";
const READ_FIELDS: &str = r#"
id, server_id, map, mode, side, max_players, round, round_objective,
winner_team, status, started_at, ended_at, applied_offset"#;

pub async fn fetch_ongoing<C: Context>(ctx: &C, server_id: i64) -> sqlx::Result<Vec<Match>> {
    const QUERY: &str = const_str::concat!(
        "SELECT ",
        READ_FIELDS,
        " FROM ",
        TABLE_NAME,
        " WHERE server_id = ? AND status = 'ongoing' ORDER BY started_at, id"
    );
    sqlx::query_as(QUERY)
        .bind(server_id)
        .fetch_all(ctx.db())
        .await
}

pub async fn fetch_applied_offset<C: Context>(ctx: &C, server_id: i64) -> sqlx::Result<u64> {
    const QUERY: &str = const_str::concat!(
        "SELECT CAST(COALESCE(MAX(applied_offset), 0) AS UNSIGNED) FROM ",
        TABLE_NAME,
        " WHERE server_id = ?"
    );
    sqlx::query_scalar(QUERY)
        .bind(server_id)
        .fetch_one(ctx.db())
        .await
}

pub async fn create<C: Context>(ctx: &C, args: &CreateMatchArgs<'_>) -> sqlx::Result<Match> {
    let mut new_match = Match {
        id: 0,
        server_id: args.server_id,
        map: args.map.to_owned(),
        mode: args.mode.to_owned(),
        side: args.side.map(str::to_owned),
        max_players: args.max_players,
        round: 0,
        round_objective: 0,
        winner_team: None,
        status: MatchStatus::Ongoing.as_str().to_owned(),
        started_at: args.started_at,
        ended_at: None,
        applied_offset: args.applied_offset,
    };
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        r#" (server_id, map, mode, side, max_players, round, round_objective, status,
        started_at, applied_offset)"#,
        " VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?, ?)"
    );
    let query_result = sqlx::query(QUERY)
        .bind(args.server_id)
        .bind(args.map)
        .bind(args.mode)
        .bind(args.side)
        .bind(args.max_players)
        .bind(&new_match.status)
        .bind(args.started_at)
        .bind(args.applied_offset)
        .execute(ctx.db())
        .await?;
    new_match.id = query_result.last_insert_id() as _;
    Ok(new_match)
}

pub async fn update<C: Context>(ctx: &C, m: &Match) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "UPDATE ",
        TABLE_NAME,
        r#" SET round = ?, round_objective = ?, winner_team = ?, status = ?, ended_at = ?,
        applied_offset = GREATEST(applied_offset, ?)"#,
        " WHERE id = ?"
    );
    sqlx::query(QUERY)
        .bind(m.round)
        .bind(m.round_objective)
        .bind(m.winner_team)
        .bind(&m.status)
        .bind(m.ended_at)
        .bind(m.applied_offset)
        .bind(m.id)
        .execute(ctx.db())
        .await?;
    Ok(())
}
