use crate::common::error::{ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::entities::match_player_stats::{MatchPlayerStat, PlayerTotals, StatDelta};
use crate::models::weapons::{WeaponType, normalize_weapon};
use crate::retry_once;
use chrono::{DateTime, Utc};

pub async fn add(
    store: &dyn StatStore,
    match_id: i64,
    player_id: i64,
    delta: StatDelta,
    applied_offset: u64,
) -> ServiceResult<()> {
    match retry_once!(
        "add_player_stat",
        store.add_player_stat(match_id, player_id, &delta, applied_offset)
    ) {
        Ok(()) => Ok(()),
        Err(e) => unexpected(e),
    }
}

pub async fn add_weapon_kill(
    store: &dyn StatStore,
    match_id: i64,
    player_id: i64,
    weapon: &str,
    applied_offset: u64,
) -> ServiceResult<()> {
    let weapon = normalize_weapon(weapon);
    let weapon_type = WeaponType::from_weapon(weapon);
    match retry_once!(
        "add_weapon_kill",
        store.add_weapon_kill(match_id, player_id, weapon, weapon_type, applied_offset)
    ) {
        Ok(()) => Ok(()),
        Err(e) => unexpected(e),
    }
}

pub async fn connect(
    store: &dyn StatStore,
    match_id: i64,
    player_id: i64,
    at: DateTime<Utc>,
    applied_offset: u64,
) -> ServiceResult<()> {
    match retry_once!(
        "mark_connected",
        store.mark_connected(match_id, player_id, at, applied_offset)
    ) {
        Ok(()) => Ok(()),
        Err(e) => unexpected(e),
    }
}

pub async fn disconnect(
    store: &dyn StatStore,
    match_id: i64,
    player_id: i64,
    at: DateTime<Utc>,
    applied_offset: u64,
) -> ServiceResult<()> {
    match retry_once!(
        "mark_disconnected",
        store.mark_disconnected(match_id, player_id, at, applied_offset)
    ) {
        Ok(()) => Ok(()),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_one(
    store: &dyn StatStore,
    match_id: i64,
    player_id: i64,
) -> ServiceResult<Option<MatchPlayerStat>> {
    match store.fetch_player_stat(match_id, player_id).await {
        Ok(stat) => Ok(stat),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_match(store: &dyn StatStore, match_id: i64) -> ServiceResult<Vec<MatchPlayerStat>> {
    match store.fetch_match_stats(match_id).await {
        Ok(stats) => Ok(stats),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_totals(store: &dyn StatStore, player_id: i64) -> ServiceResult<PlayerTotals> {
    match store.fetch_player_totals(player_id).await {
        Ok(totals) => Ok(totals),
        Err(e) => unexpected(e),
    }
}
