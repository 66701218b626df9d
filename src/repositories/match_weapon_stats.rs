use crate::common::context::Context;
use crate::models::weapons::WeaponType;

const TABLE_NAME: &str = "match_weapon_stats";

pub async fn add_kill<C: Context>(
    ctx: &C,
    match_id: i64,
    player_id: i64,
    weapon: &str,
    weapon_type: WeaponType,
    applied_offset: u64,
) -> sqlx::Result<()> {
    const QUERY: &str = const_str::concat!(
        "INSERT INTO ",
        TABLE_NAME,
        " (match_id, player_id, weapon, weapon_type, kills, applied_offset) VALUES (?, ?, ?, ?, 1, ?)",
        r#" ON DUPLICATE KEY UPDATE
        kills = IF(VALUES(applied_offset) > applied_offset, kills + 1, kills),
        applied_offset = GREATEST(applied_offset, VALUES(applied_offset))"#
    );
    sqlx::query(QUERY)
        .bind(match_id)
        .bind(player_id)
        .bind(weapon)
        .bind(weapon_type.as_str())
        .bind(applied_offset)
        .execute(ctx.db())
        .await?;
    Ok(())
}
