use crate::events::{EventContext, EventResult};
use crate::models::servers::ServerState;
use crate::usecases::matches;
use chrono::{DateTime, Utc};

pub async fn handle(ctx: &EventContext, state: &mut ServerState, at: DateTime<Utc>) -> EventResult {
    matches::finish(ctx.store(), state, at).await
}
