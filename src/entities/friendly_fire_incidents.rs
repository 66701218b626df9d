use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FriendlyFireIncident {
    pub id: i64,
    pub match_id: i64,
    pub server_id: i64,
    pub attacker_player_id: i64,
    pub victim_player_id: Option<i64>,
    pub attacker_team: i32,
    pub victim_team: i32,
    pub weapon: String,
    pub seconds_into_match: i64,
    pub seconds_since_previous: Option<i64>,
    pub is_explosive: bool,
    pub is_vehicle: bool,
    pub map: String,
    pub mode: String,
    pub occurred_at: DateTime<Utc>,
    pub applied_offset: u64,
}

pub struct CreateIncidentArgs<'a> {
    pub match_id: i64,
    pub server_id: i64,
    pub attacker_player_id: i64,
    pub victim_player_id: Option<i64>,
    pub attacker_team: i32,
    pub victim_team: i32,
    pub weapon: &'a str,
    pub seconds_into_match: i64,
    pub seconds_since_previous: Option<i64>,
    pub is_explosive: bool,
    pub is_vehicle: bool,
    pub map: &'a str,
    pub mode: &'a str,
    pub occurred_at: DateTime<Utc>,
    pub applied_offset: u64,
}
