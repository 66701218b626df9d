pub mod activity;
pub mod friendly_fire_incidents;
pub mod match_player_stats;
pub mod match_weapon_stats;
pub mod matches;
pub mod memory;
pub mod players;
pub mod servers;

use crate::common::state::AppState;
use crate::common::store::StatStore;
use crate::entities::friendly_fire_incidents::CreateIncidentArgs;
use crate::entities::match_player_stats::{MatchPlayerStat, PlayerTotals, StatDelta};
use crate::entities::matches::{CreateMatchArgs, Match};
use crate::entities::players::Player;
use crate::entities::servers::{Server, UpsertServerArgs};
use crate::models::matches::StatStatus;
use crate::models::weapons::WeaponType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl StatStore for AppState {
    async fn upsert_server(&self, args: &UpsertServerArgs<'_>) -> anyhow::Result<Server> {
        Ok(servers::upsert(self, args).await?)
    }

    async fn save_log_position(
        &self,
        server_id: i64,
        log_base: u64,
        offset: u64,
        opened_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<()> {
        Ok(servers::save_log_position(self, server_id, log_base, offset, opened_at).await?)
    }

    async fn fetch_applied_offset(&self, server_id: i64) -> anyhow::Result<u64> {
        Ok(matches::fetch_applied_offset(self, server_id).await?)
    }

    async fn fetch_ongoing_matches(&self, server_id: i64) -> anyhow::Result<Vec<Match>> {
        Ok(matches::fetch_ongoing(self, server_id).await?)
    }

    async fn create_match(&self, args: &CreateMatchArgs<'_>) -> anyhow::Result<Match> {
        Ok(matches::create(self, args).await?)
    }

    async fn update_match(&self, m: &Match) -> anyhow::Result<()> {
        Ok(matches::update(self, m).await?)
    }

    async fn fetch_player(&self, platform_id: &str) -> anyhow::Result<Option<Player>> {
        Ok(players::fetch_one_by_platform_id(self, platform_id).await?)
    }

    async fn fetch_player_by_id(&self, player_id: i64) -> anyhow::Result<Option<Player>> {
        Ok(players::fetch_one(self, player_id).await?)
    }

    async fn upsert_player(&self, platform_id: &str, name: &str) -> anyhow::Result<Player> {
        Ok(players::upsert(self, platform_id, name).await?)
    }

    async fn fetch_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
    ) -> anyhow::Result<Option<MatchPlayerStat>> {
        Ok(match_player_stats::fetch_one(self, match_id, player_id).await?)
    }

    async fn fetch_match_stats(&self, match_id: i64) -> anyhow::Result<Vec<MatchPlayerStat>> {
        Ok(match_player_stats::fetch_by_match(self, match_id).await?)
    }

    async fn add_player_stat(
        &self,
        match_id: i64,
        player_id: i64,
        delta: &StatDelta,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        Ok(match_player_stats::add(self, match_id, player_id, delta, applied_offset).await?)
    }

    async fn mark_connected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        Ok(match_player_stats::mark_connected(self, match_id, player_id, at, applied_offset).await?)
    }

    async fn mark_disconnected(
        &self,
        match_id: i64,
        player_id: i64,
        at: DateTime<Utc>,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        Ok(
            match_player_stats::mark_disconnected(self, match_id, player_id, at, applied_offset)
                .await?,
        )
    }

    async fn close_player_stats(
        &self,
        match_id: i64,
        at: DateTime<Utc>,
        status: StatStatus,
    ) -> anyhow::Result<()> {
        Ok(match_player_stats::close_all(self, match_id, at, status).await?)
    }

    async fn reconcile_score(
        &self,
        match_id: i64,
        player_id: i64,
        score: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        Ok(match_player_stats::reconcile_score(self, match_id, player_id, score, at).await?)
    }

    async fn add_weapon_kill(
        &self,
        match_id: i64,
        player_id: i64,
        weapon: &str,
        weapon_type: WeaponType,
        applied_offset: u64,
    ) -> anyhow::Result<()> {
        Ok(match_weapon_stats::add_kill(
            self,
            match_id,
            player_id,
            weapon,
            weapon_type,
            applied_offset,
        )
        .await?)
    }

    async fn create_friendly_fire_incident(
        &self,
        args: &CreateIncidentArgs<'_>,
    ) -> anyhow::Result<()> {
        Ok(friendly_fire_incidents::create(self, args).await?)
    }

    async fn fetch_player_totals(&self, player_id: i64) -> anyhow::Result<PlayerTotals> {
        Ok(match_player_stats::fetch_totals(self, player_id).await?)
    }
}
