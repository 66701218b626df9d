use crate::common::context::Context;
use crate::entities::friendly_fire_incidents::CreateIncidentArgs;

const TABLE_NAME: &str = "friendly_fire_incidents";

/// Ignored when the match already has an incident at the same log offset.
pub async fn create<C: Context>(ctx: &C, args: &CreateIncidentArgs<'_>) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "INSERT IGNORE INTO ",
        TABLE_NAME,
        r#" (match_id, server_id, attacker_player_id, victim_player_id, attacker_team,
        victim_team, weapon, seconds_into_match, seconds_since_previous, is_explosive,
        is_vehicle, map, mode, occurred_at, applied_offset)"#,
        " VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(QUERY)
        .bind(args.match_id)
        .bind(args.server_id)
        .bind(args.attacker_player_id)
        .bind(args.victim_player_id)
        .bind(args.attacker_team)
        .bind(args.victim_team)
        .bind(args.weapon)
        .bind(args.seconds_into_match)
        .bind(args.seconds_since_previous)
        .bind(args.is_explosive)
        .bind(args.is_vehicle)
        .bind(args.map)
        .bind(args.mode)
        .bind(args.occurred_at)
        .bind(args.applied_offset)
        .execute(ctx.db())
        .await?;
    Ok(())
}
