use crate::common::error::{ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::entities::friendly_fire_incidents::CreateIncidentArgs;
use crate::entities::matches::Match;
use crate::entities::players::Player;
use crate::models::weapons::{WeaponType, normalize_weapon};
use crate::retry_once;
use chrono::{DateTime, Utc};
use tracing::info;

pub struct TeamKill<'a> {
    pub attacker: &'a Player,
    pub attacker_team: i32,
    /// `None` when the victim is a bot or not yet known.
    pub victim: Option<&'a Player>,
    pub victim_team: i32,
    pub weapon: &'a str,
    /// Previous team kill by the same attacker in this match.
    pub previous_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
    pub applied_offset: u64,
}

pub async fn record(
    store: &dyn StatStore,
    ongoing: &Match,
    kill: &TeamKill<'_>,
) -> ServiceResult<()> {
    let weapon = normalize_weapon(kill.weapon);
    let weapon_type = WeaponType::from_weapon(weapon);
    let args = CreateIncidentArgs {
        match_id: ongoing.id,
        server_id: ongoing.server_id,
        attacker_player_id: kill.attacker.id,
        victim_player_id: kill.victim.map(|victim| victim.id),
        attacker_team: kill.attacker_team,
        victim_team: kill.victim_team,
        weapon,
        seconds_into_match: (kill.at - ongoing.started_at).num_seconds().max(0),
        seconds_since_previous: kill
            .previous_at
            .map(|previous| (kill.at - previous).num_seconds().max(0)),
        is_explosive: weapon_type == WeaponType::Explosive,
        is_vehicle: weapon_type == WeaponType::Vehicle,
        map: &ongoing.map,
        mode: &ongoing.mode,
        occurred_at: kill.at,
        applied_offset: kill.applied_offset,
    };
    if let Err(e) = retry_once!(
        "create_friendly_fire_incident",
        store.create_friendly_fire_incident(&args)
    ) {
        return unexpected(e);
    }

    info!(
        match_id = ongoing.id,
        attacker_player_id = kill.attacker.id,
        victim_player_id = args.victim_player_id,
        weapon,
        "Friendly fire kill"
    );
    Ok(())
}
