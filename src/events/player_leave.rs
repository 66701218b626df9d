use crate::common::error::AppError;
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
    let match_id = state.ongoing_match_id().ok_or(AppError::MatchesNoneOngoing)?;
    let player = players::fetch_by_platform_id(ctx.store(), &identity.platform_id).await?;
    stats::disconnect(ctx.store(), match_id, player.id, at, state.line_offset).await?;
    debug!(match_id, player_id = player.id, "Player left");
    Ok(())
}
