use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::entities::players::Player;
use crate::models::events::{PlayerIdentity, PlayerToken};
use crate::retry_once;

/// The only way a player row comes into existence.
pub async fn register(store: &dyn StatStore, identity: &PlayerIdentity) -> ServiceResult<Player> {
    match retry_once!(
        "upsert_player",
        store.upsert_player(&identity.platform_id, &identity.name)
    ) {
        Ok(player) => Ok(player),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_by_platform_id(store: &dyn StatStore, platform_id: &str) -> ServiceResult<Player> {
    match retry_once!("fetch_player", store.fetch_player(platform_id)) {
        Ok(Some(player)) => Ok(player),
        Ok(None) => Err(AppError::PlayersNotFound),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_by_id(store: &dyn StatStore, player_id: i64) -> ServiceResult<Player> {
    match store.fetch_player_by_id(player_id).await {
        Ok(Some(player)) => Ok(player),
        Ok(None) => Err(AppError::PlayersNotFound),
        Err(e) => unexpected(e),
    }
}

/// Resolves a kill or objective token to a known player without creating one.
pub async fn resolve(store: &dyn StatStore, token: &PlayerToken) -> ServiceResult<Player> {
    match &token.platform_id {
        Some(platform_id) => fetch_by_platform_id(store, platform_id).await,
        None => Err(AppError::PlayersBot),
    }
}
