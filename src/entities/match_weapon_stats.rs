#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchWeaponStat {
    pub match_id: i64,
    pub player_id: i64,
    pub weapon: String,
    pub weapon_type: String,
    pub kills: i32,
    pub applied_offset: u64,
}
