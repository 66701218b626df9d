use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Match {
    pub id: i64,
    pub server_id: i64,
    pub map: String,
    pub mode: String,
    pub side: Option<String>,
    pub max_players: Option<i32>,
    pub round: i32,
    pub round_objective: i32,
    pub winner_team: Option<i32>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Log offset of the last line that changed this row.
    pub applied_offset: u64,
}

pub struct CreateMatchArgs<'a> {
    pub server_id: i64,
    pub map: &'a str,
    pub mode: &'a str,
    pub side: Option<&'a str>,
    pub max_players: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub applied_offset: u64,
}
