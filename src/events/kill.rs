use crate::common::error::AppError;
use crate::entities::match_player_stats::StatDelta;
use crate::events::{EventContext, EventResult, credited_player, log_dropped};
use crate::models::events::{KillEvent, PlayerToken};
use crate::models::servers::ServerState;
use crate::usecases::friendly_fire::{self, TeamKill};
use crate::usecases::stats;
use chrono::{DateTime, Utc};

fn same_team(a: &PlayerToken, b: &PlayerToken) -> bool {
    matches!((a.team, b.team), (Some(a), Some(b)) if a == b)
}

/// Credits one kill line:
/// * suicide: the victim gets a death, nothing else
/// * team kill: the primary attacker gets a friendly fire kill and an incident is recorded
/// * otherwise the primary attacker gets the kill and the weapon kill
///
/// Every further attacker gets an assist and a weapon kill whatever the primary's
/// relation to the victim. Bots and unknown players receive nothing.
pub async fn handle(
    ctx: &EventContext,
    state: &mut ServerState,
    kill: &KillEvent,
    at: DateTime<Utc>,
) -> EventResult {
    let ongoing = state.ongoing.clone().ok_or(AppError::MatchesNoneOngoing)?;
    let Some((primary, assistants)) = kill.attackers.split_first() else {
        return Ok(());
    };
    let store = ctx.store();
    let offset = state.line_offset;
    let victim = credited_player(ctx, &kill.victim).await;

    if primary.same_player(&kill.victim) {
        if let Some(victim) = &victim {
            log_dropped(
                stats::add(store, ongoing.id, victim.id, StatDelta::death(), offset).await,
                "suicide death",
            );
        }
    } else if same_team(primary, &kill.victim) {
        if let Some(attacker) = credited_player(ctx, primary).await {
            log_dropped(
                stats::add(
                    store,
                    ongoing.id,
                    attacker.id,
                    StatDelta::friendly_fire_kill(),
                    offset,
                )
                .await,
                "friendly fire kill",
            );
            let previous_at = state.last_friendly_fire.insert(attacker.id, at);
            let team_kill = TeamKill {
                attacker: &attacker,
                attacker_team: primary.team.unwrap_or_default(),
                victim: victim.as_ref(),
                victim_team: kill.victim.team.unwrap_or_default(),
                weapon: &kill.weapon,
                previous_at,
                at,
                applied_offset: offset,
            };
            log_dropped(
                friendly_fire::record(store, &ongoing, &team_kill).await,
                "friendly fire incident",
            );
        }
        if let Some(victim) = &victim {
            log_dropped(
                stats::add(store, ongoing.id, victim.id, StatDelta::death(), offset).await,
                "team kill death",
            );
        }
    } else {
        if let Some(attacker) = credited_player(ctx, primary).await {
            log_dropped(
                stats::add(store, ongoing.id, attacker.id, StatDelta::kill(), offset).await,
                "kill",
            );
            log_dropped(
                stats::add_weapon_kill(store, ongoing.id, attacker.id, &kill.weapon, offset)
                    .await,
                "weapon kill",
            );
        }
        if let Some(victim) = &victim {
            log_dropped(
                stats::add(store, ongoing.id, victim.id, StatDelta::death(), offset).await,
                "death",
            );
        }
    }

    for assistant in assistants {
        let Some(player) = credited_player(ctx, assistant).await else {
            continue;
        };
        log_dropped(
            stats::add(store, ongoing.id, player.id, StatDelta::assist(), offset).await,
            "assist",
        );
        log_dropped(
            stats::add_weapon_kill(store, ongoing.id, player.id, &kill.weapon, offset).await,
            "assist weapon kill",
        );
    }
    Ok(())
}
