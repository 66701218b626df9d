use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::entities::matches::{CreateMatchArgs, Match};
use crate::models::events::{MapChange, RoundEnd};
use crate::models::matches::{MatchStatus, StatStatus};
use crate::models::servers::ServerState;
use crate::retry_once;
use crate::usecases::stats;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Loads the ongoing match of a server. More than one ongoing match breaks the
/// per-server invariant: every one but the newest is closed as crashed.
pub async fn load_ongoing(store: &dyn StatStore, server_id: i64) -> ServiceResult<Option<Match>> {
    let mut ongoing = match retry_once!(
        "fetch_ongoing_matches",
        store.fetch_ongoing_matches(server_id)
    ) {
        Ok(ongoing) => ongoing,
        Err(e) => return unexpected(e),
    };
    let Some(newest) = ongoing.pop() else {
        return Ok(None);
    };

    if !ongoing.is_empty() {
        error!(
            server_id,
            match_id = newest.id,
            stale_matches = ongoing.len(),
            "Server has more than one ongoing match, crashing the older ones"
        );
        for stale in ongoing {
            close(store, stale, MatchStatus::Crashed, newest.started_at).await?;
        }
    }
    Ok(Some(newest))
}

/// Starts a match for `change`, finishing the ongoing one first.
///
/// Players still connected to the finished match keep playing on the new map,
/// so each of them opens a session in the new match.
pub async fn start(
    store: &dyn StatStore,
    state: &mut ServerState,
    change: &MapChange,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    let mut carried = Vec::new();
    if let Some(ongoing) = &state.ongoing {
        if ongoing.started_at == at && ongoing.map == change.map && ongoing.mode == change.mode {
            debug!(match_id = ongoing.id, "Match was already started by this line");
            return Ok(());
        }
        carried = connected_players(store, ongoing.id).await;
        if let Err(e) = finish(store, state, at).await {
            e.log("Failed to finish the previous match");
        }
    }

    let args = CreateMatchArgs {
        server_id: state.server_id(),
        map: &change.map,
        mode: &change.mode,
        side: change.side.as_deref(),
        max_players: change.max_players,
        started_at: at,
        applied_offset: state.line_offset,
    };
    let new_match = match retry_once!("create_match", store.create_match(&args)) {
        Ok(new_match) => new_match,
        Err(e) => return unexpected(e),
    };
    for &player_id in &carried {
        let carried_session = stats::connect(store, new_match.id, player_id, at, state.line_offset);
        if let Err(e) = carried_session.await {
            e.log("Failed to carry a session into the new match");
        }
    }
    info!(
        server_id = state.server_id(),
        match_id = new_match.id,
        map = %new_match.map,
        mode = %new_match.mode,
        carried_sessions = carried.len(),
        "Match started"
    );
    state.begin_match(new_match);
    Ok(())
}

async fn connected_players(store: &dyn StatStore, match_id: i64) -> Vec<i64> {
    match retry_once!("fetch_match_stats", store.fetch_match_stats(match_id)) {
        Ok(stats) => stats
            .into_iter()
            .filter(|stat| stat.is_currently_connected)
            .map(|stat| stat.player_id)
            .collect(),
        Err(e) => {
            warn!(match_id, "Failed to load the sessions of the previous match: {e:?}");
            Vec::new()
        }
    }
}

pub async fn finish(
    store: &dyn StatStore,
    state: &mut ServerState,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    let mut ongoing = state.ongoing.take().ok_or(AppError::MatchesNoneOngoing)?;
    state.last_friendly_fire.clear();
    ongoing.applied_offset = ongoing.applied_offset.max(state.line_offset);
    close(store, ongoing, MatchStatus::Finished, at).await?;
    Ok(())
}

pub async fn crash(
    store: &dyn StatStore,
    state: &mut ServerState,
    at: DateTime<Utc>,
) -> ServiceResult<()> {
    let mut ongoing = state.ongoing.take().ok_or(AppError::MatchesNoneOngoing)?;
    state.last_friendly_fire.clear();
    ongoing.applied_offset = ongoing.applied_offset.max(state.line_offset);
    close(store, ongoing, MatchStatus::Crashed, at).await?;
    Ok(())
}

async fn close(
    store: &dyn StatStore,
    mut m: Match,
    status: MatchStatus,
    at: DateTime<Utc>,
) -> ServiceResult<Match> {
    // Player rows close before the match row, whose applied offset marks the
    // closing line as done.
    let stat_status = match status {
        MatchStatus::Finished => StatStatus::Finished,
        _ => StatStatus::Disconnected,
    };
    if let Err(e) = retry_once!(
        "close_player_stats",
        store.close_player_stats(m.id, at, stat_status)
    ) {
        return unexpected(e);
    }

    m.status = status.as_str().to_owned();
    m.ended_at = Some(at.max(m.started_at));
    if let Err(e) = retry_once!("update_match", store.update_match(&m)) {
        return unexpected(e);
    }

    info!(
        server_id = m.server_id,
        match_id = m.id,
        status = %m.status,
        rounds = m.round,
        "Match ended"
    );
    Ok(m)
}

pub async fn start_round(
    store: &dyn StatStore,
    state: &mut ServerState,
    round: i32,
) -> ServiceResult<()> {
    let line_offset = state.line_offset;
    let ongoing = state.ongoing.as_mut().ok_or(AppError::MatchesNoneOngoing)?;
    debug!(match_id = ongoing.id, round, "Round started");
    if ongoing.round_objective == 0 {
        return Ok(());
    }
    ongoing.round_objective = 0;
    persist(store, ongoing, line_offset).await
}

/// Rounds are counted rather than copied from the line, so a match joined
/// halfway through still counts only the rounds it saw.
pub async fn end_round(
    store: &dyn StatStore,
    state: &mut ServerState,
    round_end: &RoundEnd,
) -> ServiceResult<()> {
    let line_offset = state.line_offset;
    let ongoing = state.ongoing.as_mut().ok_or(AppError::MatchesNoneOngoing)?;
    if line_offset <= ongoing.applied_offset {
        debug!(match_id = ongoing.id, "Round end was already counted");
        return Ok(());
    }
    ongoing.round += 1;
    ongoing.winner_team = round_end.winner_team;
    debug!(
        match_id = ongoing.id,
        round = ongoing.round,
        logged_round = round_end.round,
        winner_team = round_end.winner_team,
        reason = ?round_end.reason,
        "Round ended"
    );
    persist(store, ongoing, line_offset).await
}

pub async fn add_objective(store: &dyn StatStore, state: &mut ServerState) -> ServiceResult<()> {
    let line_offset = state.line_offset;
    let ongoing = state.ongoing.as_mut().ok_or(AppError::MatchesNoneOngoing)?;
    if line_offset <= ongoing.applied_offset {
        return Ok(());
    }
    ongoing.round_objective += 1;
    persist(store, ongoing, line_offset).await
}

async fn persist(store: &dyn StatStore, m: &mut Match, line_offset: u64) -> ServiceResult<()> {
    m.applied_offset = m.applied_offset.max(line_offset);
    match retry_once!("update_match", store.update_match(m)) {
        Ok(()) => Ok(()),
        Err(e) => unexpected(e),
    }
}
