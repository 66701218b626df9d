use crate::events::{EventContext, EventResult};
use crate::models::events::PlayerIdentity;
use crate::models::servers::ServerState;
use crate::usecases::{players, stats};
use chrono::{DateTime, Utc};
use tracing::debug;

pub async fn handle(
    ctx: &EventContext,
    state: &mut ServerState,
    identity: &PlayerIdentity,
    at: DateTime<Utc>,
) -> EventResult {
    state.pending_logins.remove(&identity.platform_id);
    let player = players::register(ctx.store(), identity).await?;
    let Some(match_id) = state.ongoing_match_id() else {
        debug!(player_id = player.id, "Player joined outside of a match");
        return Ok(());
    };
    stats::connect(ctx.store(), match_id, player.id, at, state.line_offset).await?;
    debug!(match_id, player_id = player.id, name = %player.name, "Player joined");
    Ok(())
}
