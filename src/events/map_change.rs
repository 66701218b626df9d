use crate::events::{EventContext, EventResult};
use crate::models::events::MapChange;
use crate::models::servers::ServerState;
use crate::usecases::matches;
use chrono::{DateTime, Utc};
use tracing::debug;

/// How long after a travel the destination map may still be loading.
const TRAVEL_LOAD_WINDOW_SECS: i64 = 120;

pub async fn handle_travel(
    ctx: &EventContext,
    state: &mut ServerState,
    change: &MapChange,
    at: DateTime<Utc>,
) -> EventResult {
    state.last_travel_at = Some(at);
    matches::start(ctx.store(), state, change, at).await
}

pub async fn handle_load(
    ctx: &EventContext,
    state: &mut ServerState,
    change: &MapChange,
    at: DateTime<Utc>,
) -> EventResult {
    if is_travel_load(state, change, at) {
        debug!(
            server_id = state.external_id(),
            map = %change.map,
            "Map load belongs to the preceding travel"
        );
        return Ok(());
    }
    matches::start(ctx.store(), state, change, at).await
}

fn is_travel_load(state: &ServerState, change: &MapChange, at: DateTime<Utc>) -> bool {
    let Some(travel_at) = state.last_travel_at else {
        return false;
    };
    let travelled_here = state
        .ongoing
        .as_ref()
        .is_some_and(|ongoing| ongoing.map == change.map && ongoing.mode == change.mode);
    let since = (at - travel_at).num_seconds();
    travelled_here && (0..=TRAVEL_LOAD_WINDOW_SECS).contains(&since)
}
