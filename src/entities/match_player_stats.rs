use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchPlayerStat {
    pub match_id: i64,
    pub player_id: i64,
    pub kills: i32,
    pub assists: i32,
    pub deaths: i32,
    pub friendly_fire_kills: i32,
    pub objectives_captured: i32,
    pub objectives_destroyed: i32,
    pub score: i64,
    /// Seconds
    pub total_play_time: i64,
    pub session_count: i32,
    pub is_currently_connected: bool,
    pub status: String,
    pub first_joined_at: Option<DateTime<Utc>>,
    pub last_left_at: Option<DateTime<Utc>>,
    /// Start of the connected span that is not yet part of `total_play_time`.
    pub play_time_anchor: Option<DateTime<Utc>>,
    /// Log offset of the last line counted in this row. A line at or before it
    /// is not counted again.
    pub applied_offset: u64,
}

impl MatchPlayerStat {
    pub fn empty(match_id: i64, player_id: i64) -> Self {
        Self {
            match_id,
            player_id,
            kills: 0,
            assists: 0,
            deaths: 0,
            friendly_fire_kills: 0,
            objectives_captured: 0,
            objectives_destroyed: 0,
            score: 0,
            total_play_time: 0,
            session_count: 0,
            is_currently_connected: false,
            status: "ongoing".to_owned(),
            first_joined_at: None,
            last_left_at: None,
            play_time_anchor: None,
            applied_offset: 0,
        }
    }
}

/// Counter increments applied in a single upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatDelta {
    pub kills: i32,
    pub assists: i32,
    pub deaths: i32,
    pub friendly_fire_kills: i32,
    pub objectives_captured: i32,
    pub objectives_destroyed: i32,
}

impl StatDelta {
    pub const fn kill() -> Self {
        Self { kills: 1, ..Self::none() }
    }

    pub const fn assist() -> Self {
        Self { assists: 1, ..Self::none() }
    }

    pub const fn death() -> Self {
        Self { deaths: 1, ..Self::none() }
    }

    pub const fn friendly_fire_kill() -> Self {
        Self { friendly_fire_kills: 1, ..Self::none() }
    }

    pub const fn objective_captured() -> Self {
        Self { objectives_captured: 1, ..Self::none() }
    }

    pub const fn objective_destroyed() -> Self {
        Self { objectives_destroyed: 1, ..Self::none() }
    }

    const fn none() -> Self {
        Self {
            kills: 0,
            assists: 0,
            deaths: 0,
            friendly_fire_kills: 0,
            objectives_captured: 0,
            objectives_destroyed: 0,
        }
    }
}

/// Lifetime counters summed over every match of a player.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct PlayerTotals {
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub matches: i64,
}
