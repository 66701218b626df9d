use crate::events::{EventContext, EventResult};
use crate::models::events::RoundEnd;
use crate::models::servers::ServerState;
use crate::usecases::matches;

pub async fn handle_start(ctx: &EventContext, state: &mut ServerState, round: i32) -> EventResult {
    matches::start_round(ctx.store(), state, round).await
}

pub async fn handle_end(ctx: &EventContext, state: &mut ServerState, round_end: &RoundEnd) -> EventResult {
    matches::end_round(ctx.store(), state, round_end).await
}
