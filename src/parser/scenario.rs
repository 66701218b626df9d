use crate::models::events::MapChange;

const MODES: [&str; 12] = [
    "Checkpoint",
    "CheckpointHardcore",
    "Push",
    "Firefight",
    "Domination",
    "Skirmish",
    "Frontline",
    "Survival",
    "Outpost",
    "Ambush",
    "Defusal",
    "TeamDeathmatch",
];
const SIDES: [&str; 2] = ["Security", "Insurgents"];

/// Parses a travel URL like `Farmhouse?Scenario=Scenario_Farmhouse_Push_Insurgents?MaxPlayers=28`.
/// `map` is the part before the first `?`, already stripped of any path.
pub fn parse_map_url(url: &str) -> Option<MapChange> {
    let mut parts = url.trim().split('?');
    let map = parts.next()?.rsplit('/').next()?.trim();
    if map.is_empty() {
        return None;
    }

    let mut scenario = None;
    let mut max_players = None;
    for option in parts {
        match option.split_once('=') {
            Some(("Scenario", value)) => scenario = Some(value.trim()),
            Some(("MaxPlayers", value)) => max_players = value.trim().parse().ok(),
            _ => {}
        }
    }

    let scenario = scenario?;
    let (mode, side) = parse_scenario(scenario)?;
    Some(MapChange {
        map: map.to_owned(),
        scenario: Some(scenario.to_owned()),
        mode: mode.to_owned(),
        side: side.map(str::to_owned),
        max_players,
    })
}

/// `Scenario_Hideout_Checkpoint_Security` -> (`Checkpoint`, Some(`Security`))
pub fn parse_scenario(scenario: &str) -> Option<(&str, Option<&str>)> {
    let body = scenario.strip_prefix("Scenario_")?;
    let parts: Vec<&str> = body.split('_').collect();
    let side = parts.last().copied().filter(|last| SIDES.contains(last));
    let mode = parts
        .iter()
        .skip(1)
        .copied()
        .find(|part| MODES.contains(part))
        .or_else(|| parts.get(1).copied().filter(|part| Some(*part) != side))?;
    Some((mode, side))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_and_side() {
        assert_eq!(
            parse_scenario("Scenario_Hideout_Checkpoint_Security"),
            Some(("Checkpoint", Some("Security")))
        );
        assert_eq!(
            parse_scenario("Scenario_Crossing_Skirmish"),
            Some(("Skirmish", None))
        );
        assert_eq!(parse_scenario("Hideout"), None);
    }

    #[test]
    fn parses_load_map_url() {
        let change = parse_map_url(
            "/Game/Maps/Town/Town?Scenario=Scenario_Hideout_Checkpoint_Security?MaxPlayers=28?Lighting=Day",
        )
        .unwrap();
        assert_eq!(change.map, "Town");
        assert_eq!(change.mode, "Checkpoint");
        assert_eq!(change.side.as_deref(), Some("Security"));
        assert_eq!(change.max_players, Some(28));
    }

    #[test]
    fn requires_scenario() {
        assert!(parse_map_url("/Game/Maps/Entry").is_none());
    }
}
