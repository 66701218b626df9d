use crate::events::{EventContext, EventResult};
use crate::models::events::PlayerIdentity;
use crate::models::servers::ServerState;
use crate::usecases::players;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

const PENDING_LOGIN_TTL_SECS: i64 = 600;

/// A login request is not yet authenticated, so no player is created.
pub fn handle_request(state: &mut ServerState, identity: PlayerIdentity, at: DateTime<Utc>) -> EventResult {
    let cutoff = at - TimeDelta::seconds(PENDING_LOGIN_TTL_SECS);
    state.pending_logins.retain(|_, requested_at| *requested_at >= cutoff);
    debug!(
        server_id = state.external_id(),
        platform_id = %identity.platform_id,
        name = %identity.name,
        "Login requested"
    );
    state.pending_logins.insert(identity.platform_id, at);
    Ok(())
}

pub async fn handle_register(
    ctx: &EventContext,
    state: &mut ServerState,
    identity: &PlayerIdentity,
) -> EventResult {
    let requested_at = state.pending_logins.remove(&identity.platform_id);
    let player = players::register(ctx.store(), identity).await?;
    info!(
        server_id = state.external_id(),
        player_id = player.id,
        platform_id = %player.platform_id,
        had_login_request = requested_at.is_some(),
        "Player registered"
    );
    Ok(())
}
