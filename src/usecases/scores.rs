use crate::adapters::rcon::{CommandSender, LIST_PLAYERS_COMMAND, decode_player_list};
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::retry_once;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

/// Overwrites scores and accrues play time from the live scoreboard.
/// Players unknown to the store are skipped: polling never creates players.
/// Returns the number of rows reconciled.
pub async fn reconcile(
    store: &dyn StatStore,
    commands: &dyn CommandSender,
    server_id: i64,
    external_id: &str,
    timeout: Duration,
    now: DateTime<Utc>,
) -> ServiceResult<usize> {
    let ongoing = match store.fetch_ongoing_matches(server_id).await {
        Ok(mut ongoing) => ongoing.pop().ok_or(AppError::MatchesNoneOngoing)?,
        Err(e) => return unexpected(e),
    };

    let response = tokio::time::timeout(
        timeout,
        commands.send_command(external_id, LIST_PLAYERS_COMMAND),
    )
    .await;
    let response = match response {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            warn!(server_id = external_id, "RCON list players failed: {e:?}");
            return Err(AppError::RconFailed);
        }
        Err(_) => return Err(AppError::RconTimedOut),
    };

    let mut reconciled = 0;
    for live in decode_player_list(&response) {
        let player = match store.fetch_player(&live.platform_id).await {
            Ok(Some(player)) => player,
            Ok(None) => {
                debug!(
                    platform_id = %live.platform_id,
                    "Skipping score of a player without login"
                );
                continue;
            }
            Err(e) => return unexpected(e),
        };
        match retry_once!(
            "reconcile_score",
            store.reconcile_score(ongoing.id, player.id, live.score, now)
        ) {
            Ok(true) => reconciled += 1,
            Ok(false) => debug!(
                match_id = ongoing.id,
                player_id = player.id,
                "Skipping score of a player without stats in this match"
            ),
            Err(e) => return unexpected(e),
        }
    }
    Ok(reconciled)
}
