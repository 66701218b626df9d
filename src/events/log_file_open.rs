use crate::events::{EventContext, EventResult};
use crate::models::servers::ServerState;
use crate::usecases::matches;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// A fresh log means the game server (re)started. Whatever match was running
/// in the previous process did not end cleanly.
pub async fn handle(ctx: &EventContext, state: &mut ServerState, opened_at: DateTime<Utc>) -> EventResult {
    info!(server_id = state.external_id(), %opened_at, "Log file opened");
    state.server.log_opened_at = Some(opened_at);
    state.pending_logins.clear();
    state.last_travel_at = None;

    if let Some(match_id) = state.ongoing_match_id() {
        warn!(
            server_id = state.external_id(),
            match_id, "Log reopened during a match, marking it crashed"
        );
        matches::crash(ctx.store(), state, opened_at).await?;
    }
    Ok(())
}
