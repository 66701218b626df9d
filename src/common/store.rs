use crate::entities::friendly_fire_incidents::CreateIncidentArgs;
use crate::entities::match_player_stats::{MatchPlayerStat, PlayerTotals, StatDelta};
use crate::entities::matches::{CreateMatchArgs, Match};
use crate::entities::players::Player;
use crate::entities::servers::{Server, UpsertServerArgs};
use crate::models::matches::StatStatus;
use crate::models::weapons::WeaponType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence of servers, matches, players and their stats.
///
/// Every mutation is keyed by a unique key and applied as a single upsert, so
/// log-driven writes and score reconciliation on the same row never lose updates.
///
/// Log-driven mutations carry the log offset of their line. A row that already
/// counted a line at or past that offset is left unchanged.
#[async_trait]
pub trait StatStore: Send + Sync {
    async fn upsert_server(&self, args: &UpsertServerArgs<'_>) -> anyhow::Result<Server>;

    async fn save_log_position(
        &self,
        server_id: i64,
        log_base: u64,
        offset: u64,
        opened_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()>;

    /// Highest log offset applied to any match of the server, 0 without matches.
    async fn fetch_applied_offset(&self, server_id: i64) -> anyhow::Result<u64>;

    /// Oldest first.
    async fn fetch_ongoing_matches(&self, server_id: i64) -> anyhow::Result<Vec<Match>>;

    async fn create_match(&self, args: &CreateMatchArgs<'_>) -> anyhow::Result<Match>;

    /// Persists round, objective, winner, status, end time and applied offset.
    async fn update_match(&self, m: &Match) -> anyhow::Result<()>;

    async fn fetch_player(&self, platform_id: &str) -> anyhow::Result<Option<Player>>;

    async fn fetch_player_by_id(&self, player_id: i64) -> anyhow::Result<Option<Player>>;

    async fn upsert_player(&self, platform_id: &str, name: &str) -> anyhow::Result<Player>;

    async fn fetch_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
    ) -> anyhow::Result<Option<MatchPlayerStat>>;

    /// Highest score first.
    async fn fetch_match_stats(&self, match_id: i64) -> anyhow::Result<Vec<MatchPlayerStat>>;

    /// Adds `delta` to the row, creating it when missing.
    async fn add_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
        delta: &StatDelta,
        applied_offset: u64,
    ) -> anyhow::Result<()>;

    /// Opens a session: connected, one more session, first join recorded once.
    async fn mark_connected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()>;

    /// Closes the open session of one player and accrues its play time.
    async fn mark_disconnected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()>;

    /// Closes every open session of the match and moves all rows to `status`.
    async fn close_player_stats(
        &self,
        match_id: i64,
        at: DateTime<Utc>,
        status: StatStatus,
    ) -> anyhow::Result<()>;

    /// Overwrites the score with the polled value and accrues play time of an open
    /// session up to `at`. Returns `false` when the player has no row in the match.
    async fn reconcile_score(
        &self,
        match_id: i64,
        player_id: i64,
        score: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    async fn add_weapon_kill(
        &self,
        match_id: i64,
        player_id: i64,
        weapon: &str,
        weapon_type: WeaponType,
        applied_offset: u64,
    ) -> anyhow::Result<()>;

    /// At most one incident per match and log offset.
    async fn create_friendly_fire_incident(
        &self,
        args: &CreateIncidentArgs<'_>,
    ) -> anyhow::Result<()>;

    async fn fetch_player_totals(&self, player_id: i64) -> anyhow::Result<PlayerTotals>;
}
