use crate::common::error::AppError;
use crate::entities::match_player_stats::StatDelta;
use crate::events::{EventContext, EventResult, credited_player, log_dropped};
use crate::models::events::ObjectiveEvent;
use crate::models::servers::ServerState;
use crate::usecases::{matches, stats};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Captured,
    Destroyed,
}

/// Every listed player gets the full credit.
pub async fn handle(
    ctx: &EventContext,
    state: &mut ServerState,
    objective: &ObjectiveEvent,
    outcome: Outcome,
) -> EventResult {
    let match_id = state.ongoing_match_id().ok_or(AppError::MatchesNoneOngoing)?;
    log_dropped(
        matches::add_objective(ctx.store(), state).await,
        "round objective",
    );
    debug!(
        match_id,
        objective = objective.objective,
        for_team = objective.for_team,
        ?outcome,
        players = objective.players.len(),
        "Objective taken"
    );

    let delta = match outcome {
        Outcome::Captured => StatDelta::objective_captured(),
        Outcome::Destroyed => StatDelta::objective_destroyed(),
    };
    for token in &objective.players {
        if let Some(player) = credited_player(ctx, token).await {
            log_dropped(
                stats::add(ctx.store(), match_id, player.id, delta, state.line_offset).await,
                "objective credit",
            );
        }
    }
    Ok(())
}
