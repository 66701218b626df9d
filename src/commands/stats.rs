use crate::commands::CommandResult;
use crate::common::error::AppError;
use crate::common::store::StatStore;
use crate::models::events::PlayerIdentity;
use crate::models::servers::ServerState;
use crate::usecases::{players, stats};

const TOP_PLAYERS: usize = 3;

pub async fn match_stats(
    store: &dyn StatStore,
    state: &ServerState,
    sender: &PlayerIdentity,
) -> CommandResult {
    let ongoing = state.ongoing.as_ref().ok_or(AppError::MatchesNoneOngoing)?;
    let player = players::fetch_by_platform_id(store, &sender.platform_id).await?;
    let Some(stat) = stats::fetch_one(store, ongoing.id, player.id).await? else {
        return Ok(format!("{}: no stats in this match yet", sender.name));
    };
    Ok(format!(
        "{}: {} kills, {} assists, {} deaths, score {}",
        sender.name, stat.kills, stat.assists, stat.deaths, stat.score
    ))
}

pub async fn kdr(store: &dyn StatStore, sender: &PlayerIdentity) -> CommandResult {
    let player = players::fetch_by_platform_id(store, &sender.platform_id).await?;
    let totals = stats::fetch_totals(store, player.id).await?;
    let ratio = totals.kills as f64 / totals.deaths.max(1) as f64;
    Ok(format!(
        "{}: K/D {ratio:.2} ({} kills, {} deaths over {} matches)",
        sender.name, totals.kills, totals.deaths, totals.matches
    ))
}

pub async fn top(store: &dyn StatStore, state: &ServerState) -> CommandResult {
    let ongoing = state.ongoing.as_ref().ok_or(AppError::MatchesNoneOngoing)?;
    let leaders = stats::fetch_match(store, ongoing.id).await?;
    if leaders.is_empty() {
        return Ok("No scores in this match yet".to_owned());
    }

    let mut response = "Top players:".to_owned();
    for (rank, stat) in leaders.iter().take(TOP_PLAYERS).enumerate() {
        let name = match players::fetch_by_id(store, stat.player_id).await {
            Ok(player) => player.name,
            Err(_) => format!("#{}", stat.player_id),
        };
        response.push_str(&format!(
            " {}. {name} ({} pts, {} kills)",
            rank + 1,
            stat.score,
            stat.kills
        ));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::match_player_stats::StatDelta;
    use crate::entities::matches::CreateMatchArgs;
    use crate::entities::servers::UpsertServerArgs;
    use crate::repositories::memory::MemoryStore;
    use chrono::{TimeDelta, Utc};

    #[tokio::test]
    async fn top_lists_the_three_best_scores() {
        let store = MemoryStore::new();
        let server = store
            .upsert_server(&UpsertServerArgs {
                external_id: "eu-1",
                name: "EU #1",
                log_path: "/tmp/eu-1.log",
            })
            .await
            .unwrap();
        let started_at = Utc::now();
        let m = store
            .create_match(&CreateMatchArgs {
                server_id: server.id,
                map: "Farmhouse",
                mode: "Push",
                side: None,
                max_players: None,
                started_at,
                applied_offset: 1,
            })
            .await
            .unwrap();
        let scores = [("Alpha", 120), ("Bravo", 340), ("Charlie", 15), ("Delta", 90)];
        for (slot, (name, score)) in scores.into_iter().enumerate() {
            let player = store
                .upsert_player(&format!("7656119800000000{slot}"), name)
                .await
                .unwrap();
            store
                .add_player_stat(m.id, player.id, &StatDelta::kill(), 1)
                .await
                .unwrap();
            store
                .reconcile_score(m.id, player.id, score, started_at)
                .await
                .unwrap();
        }

        let state = ServerState::new(server, Some(m), 0, TimeDelta::seconds(15));
        assert_eq!(
            top(&store, &state).await.unwrap(),
            "Top players: 1. Bravo (340 pts, 1 kills) 2. Alpha (120 pts, 1 kills) 3. Delta (90 pts, 1 kills)"
        );
    }
}
