//! Maps one raw log line to at most one [`LogEvent`].
//!
//! Parsing never fails: unknown lines yield nothing, lines of a known category
//! with a missing field are logged and dropped.

mod scenario;
mod timestamp;
pub mod tokens;

use crate::commands::COMMAND_PREFIX;
use crate::models::events::{
    ChatCommand, ChatCommandEvent, Event, KillEvent, LogEvent, ObjectiveEvent, PlayerIdentity,
    RoundEnd,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokens::{parse_identity, parse_platform_id, parse_player_token, split_top_level};
use tracing::debug;

const LOG_FILE_OPEN: &str = "Log file open, ";
const VERBOSITY_PREFIXES: [&str; 4] = ["Display: ", "Verbose: ", "Log: ", "Warning: "];

/// Per-server state the parser needs beyond the line itself.
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub last_travel_at: Option<DateTime<Utc>>,
    pub disconnect_grace: TimeDelta,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            last_travel_at: None,
            disconnect_grace: TimeDelta::zero(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ParseMiss {
    category: &'static str,
    field: &'static str,
}

const fn miss(category: &'static str, field: &'static str) -> ParseMiss {
    ParseMiss { category, field }
}

type ParseResult = Result<Option<Event>, ParseMiss>;

pub fn parse(line: &str, ctx: &ParseContext) -> Option<LogEvent> {
    let line = line
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n']);
    match parse_line(line) {
        Ok(Some(event)) if is_suppressed(&event, ctx) => {
            debug!(
                event = event.event.name(),
                "Suppressing departure right after a map travel"
            );
            None
        }
        Ok(event) => event,
        Err(ParseMiss { category, field }) => {
            debug!(category, field, line, "Dropping incomplete log line");
            None
        }
    }
}

/// Timestamp of a `[...][...]` prefixed line.
pub fn line_timestamp(line: &str) -> Option<DateTime<Utc>> {
    timestamp::split_prefix(line).map(|(ts, _)| ts)
}

/// Timestamp of a `Log file open, ...` line.
pub fn log_open_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let stamp = line
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n'])
        .strip_prefix(LOG_FILE_OPEN)?;
    timestamp::parse_open_stamp(stamp)
}

/// Lines written when an external RCON client talks to the server.
pub fn liveness_marker_timestamp(line: &str) -> Option<DateTime<Utc>> {
    let (ts, body) = timestamp::split_prefix(line)?;
    body.starts_with("LogRcon: ").then_some(ts)
}

fn parse_line(line: &str) -> Result<Option<LogEvent>, ParseMiss> {
    if line.starts_with(LOG_FILE_OPEN) {
        let opened_at = log_open_timestamp(line).ok_or(miss("log_file_open", "timestamp"))?;
        return Ok(Some(LogEvent {
            timestamp: opened_at,
            event: Event::LogFileOpen { opened_at },
        }));
    }

    let Some((timestamp, body)) = timestamp::split_prefix(line) else {
        return Ok(None);
    };
    let Some((category, message)) = body.split_once(": ") else {
        return Ok(None);
    };
    let message = strip_verbosity(message);
    let event = match category {
        "LogNet" => parse_net(message)?,
        "LogOnlineSession" => parse_online_session(message)?,
        "LogGameplayEvents" => parse_gameplay(message)?,
        "LogLoad" => parse_load(message)?,
        "LogGameMode" => parse_game_mode(message)?,
        "LogSession" => parse_session(message),
        "LogChat" => parse_chat(message)?,
        _ => None,
    };
    Ok(event.map(|event| LogEvent { timestamp, event }))
}

fn is_suppressed(event: &LogEvent, ctx: &ParseContext) -> bool {
    let departure = matches!(
        event.event,
        Event::PlayerLeave(_) | Event::PlayerDisconnect(_)
    );
    departure
        && ctx.last_travel_at.is_some_and(|travel| {
            let since = event.timestamp - travel;
            since >= TimeDelta::zero() && since <= ctx.disconnect_grace
        })
}

fn strip_verbosity(message: &str) -> &str {
    VERBOSITY_PREFIXES
        .iter()
        .find_map(|prefix| message.strip_prefix(prefix))
        .unwrap_or(message)
}

fn parse_net(message: &str) -> ParseResult {
    if let Some(rest) = message.strip_prefix("Login request: ") {
        return parse_login_request(rest).map(|identity| Some(Event::LoginRequest(identity)));
    }

    let event = if let Some(rest) = message.strip_prefix("Join succeeded: ") {
        Event::PlayerJoin(parse_connection(rest)?)
    } else if let Some(rest) = message.strip_prefix("Player left: ") {
        Event::PlayerLeave(parse_connection(rest)?)
    } else if let Some(rest) = message.strip_prefix("Player disconnected: ") {
        Event::PlayerDisconnect(parse_connection(rest)?)
    } else {
        return Ok(None);
    };
    Ok(Some(event))
}

fn parse_connection(rest: &str) -> Result<PlayerIdentity, ParseMiss> {
    parse_identity(rest).ok_or(miss("connection", "identity"))
}

/// `?Name=Foo?Other=1 userId: SteamNWI:7656... platform: SteamNWI`
fn parse_login_request(rest: &str) -> Result<PlayerIdentity, ParseMiss> {
    let (url, user) = rest
        .split_once(" userId: ")
        .ok_or(miss("login_request", "user_id"))?;
    let name = url
        .split('?')
        .find_map(|option| option.strip_prefix("Name="))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(miss("login_request", "name"))?;
    let net_id = user.split(" platform:").next().unwrap_or(user);
    let platform_id = tokens::parse_prefixed_platform_id(net_id)
        .ok_or(miss("login_request", "platform_id"))?;
    Ok(PlayerIdentity {
        platform_id: platform_id.to_owned(),
        name: name.to_owned(),
    })
}

fn parse_online_session(message: &str) -> ParseResult {
    let Some(rest) = message.strip_prefix("Registered player ") else {
        return Ok(None);
    };
    let identity = parse_identity(rest).ok_or(miss("register", "identity"))?;
    Ok(Some(Event::PlayerRegister(identity)))
}

fn parse_gameplay(message: &str) -> ParseResult {
    if let Some((attackers, rest)) = message.split_once(" killed ") {
        return parse_kill(attackers, rest).map(|kill| Some(Event::Kill(kill)));
    }
    if let Some(rest) = message.strip_prefix("Objective ") {
        return parse_objective(rest);
    }
    if let Some(rest) = message.strip_prefix("Round ") {
        return parse_round(rest);
    }
    Ok(None)
}

fn parse_kill(attackers: &str, rest: &str) -> Result<KillEvent, ParseMiss> {
    let (victim, weapon) = rest.rsplit_once(" with ").ok_or(miss("kill", "weapon"))?;
    let weapon = weapon.trim();
    if weapon.is_empty() {
        return Err(miss("kill", "weapon"));
    }

    let attackers = attackers
        .split(" + ")
        .map(parse_player_token)
        .collect::<Option<Vec<_>>>()
        .ok_or(miss("kill", "attacker"))?;
    if attackers.is_empty() {
        return Err(miss("kill", "attacker"));
    }
    let victim = parse_player_token(victim).ok_or(miss("kill", "victim"))?;
    Ok(KillEvent {
        attackers,
        victim,
        weapon: weapon.to_owned(),
    })
}

/// `2 owned by team 1 was captured for team 0 by A[7656...], B[7656...].`
fn parse_objective(rest: &str) -> ParseResult {
    let Some((objective, rest)) = rest.split_once(" owned by team ") else {
        return Ok(None);
    };
    let objective = objective
        .trim()
        .parse()
        .map_err(|_| miss("objective", "objective"))?;
    let (owning_team, rest) = rest
        .split_once(" was ")
        .ok_or(miss("objective", "action"))?;
    let owning_team = owning_team
        .trim()
        .parse()
        .map_err(|_| miss("objective", "owning_team"))?;
    let (action, rest) = rest
        .split_once(" for team ")
        .ok_or(miss("objective", "for_team"))?;
    let (for_team, players) = rest.split_once(" by ").ok_or(miss("objective", "players"))?;
    let for_team = for_team
        .trim()
        .parse()
        .map_err(|_| miss("objective", "for_team"))?;

    let players = players.trim().trim_end_matches('.');
    let players = split_top_level(players, ',')
        .into_iter()
        .filter(|token| !token.trim().is_empty())
        .map(parse_player_token)
        .collect::<Option<Vec<_>>>()
        .ok_or(miss("objective", "players"))?;
    if players.is_empty() {
        return Err(miss("objective", "players"));
    }

    let objective = ObjectiveEvent {
        objective,
        owning_team,
        for_team,
        players,
    };
    match action.trim() {
        "captured" => Ok(Some(Event::ObjectiveCaptured(objective))),
        "destroyed" => Ok(Some(Event::ObjectiveDestroyed(objective))),
        _ => Err(miss("objective", "action")),
    }
}

/// `2 started` or `1 Over: Team 0 won (win reason: Elimination)`
fn parse_round(rest: &str) -> ParseResult {
    if let Some(round) = rest.strip_suffix(" started") {
        let round = round.trim().parse().map_err(|_| miss("round_start", "round"))?;
        return Ok(Some(Event::RoundStart { round }));
    }

    let Some((round, outcome)) = rest.split_once(" Over: ") else {
        return Ok(None);
    };
    let round = round.trim().parse().map_err(|_| miss("round_end", "round"))?;
    let winner_team = outcome
        .strip_prefix("Team ")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|team| team.parse().ok());
    let reason = outcome
        .split_once("(win reason: ")
        .and_then(|(_, reason)| reason.strip_suffix(')'))
        .map(|reason| reason.trim().to_owned());
    Ok(Some(Event::RoundEnd(RoundEnd {
        round,
        winner_team,
        reason,
    })))
}

fn parse_load(message: &str) -> ParseResult {
    let Some(url) = message.strip_prefix("LoadMap: ") else {
        return Ok(None);
    };
    let change = scenario::parse_map_url(url).ok_or(miss("map_load", "scenario"))?;
    Ok(Some(Event::MapLoad(change)))
}

fn parse_game_mode(message: &str) -> ParseResult {
    let Some(url) = message.strip_prefix("ProcessServerTravel: ") else {
        return Ok(None);
    };
    let change = scenario::parse_map_url(url).ok_or(miss("map_travel", "scenario"))?;
    Ok(Some(Event::MapTravel(change)))
}

fn parse_session(message: &str) -> Option<Event> {
    message
        .contains("HandleMatchHasEnded")
        .then_some(Event::GameOver)
}

/// `Foo(76561198000000001) Global Chat: !stats`
fn parse_chat(message: &str) -> ParseResult {
    let Some((sender, text)) = message.split_once(" Chat: ") else {
        return Ok(None);
    };
    let Some(command) = text.trim().strip_prefix(COMMAND_PREFIX) else {
        return Ok(None);
    };
    let Some(command) = command
        .split_whitespace()
        .next()
        .and_then(ChatCommand::from_token)
    else {
        return Ok(None);
    };

    // drop the channel name
    let sender = sender.rsplit_once(' ').map_or(sender, |(sender, _)| sender);
    let (name, id) = sender
        .rsplit_once('(')
        .ok_or(miss("chat_command", "platform_id"))?;
    let id = id.strip_suffix(')').ok_or(miss("chat_command", "platform_id"))?;
    let platform_id = parse_platform_id(id).ok_or(miss("chat_command", "platform_id"))?;
    Ok(Some(Event::ChatCommand(ChatCommandEvent {
        player: PlayerIdentity {
            platform_id: platform_id.to_owned(),
            name: name.trim().to_owned(),
        },
        command,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::PlayerToken;
    use chrono::TimeZone;

    const TS: &str = "[2024.01.15-12.00.00:000][100]";

    fn parse_one(body: &str) -> Option<Event> {
        parse(&format!("{TS}{body}"), &ParseContext::default()).map(|e| e.event)
    }

    fn human(name: &str, id: &str, team: i32) -> PlayerToken {
        PlayerToken {
            name: name.to_owned(),
            platform_id: Some(id.to_owned()),
            team: Some(team),
        }
    }

    #[test]
    fn parses_multi_attacker_kill() {
        let event = parse_one(
            "LogGameplayEvents: Display: A[1, team 0] + B[2, team 0] killed C[3, team 1] with Weapon_X",
        );
        let Some(Event::Kill(kill)) = event else {
            panic!("expected a kill, got {event:?}");
        };
        assert_eq!(kill.attackers, vec![human("A", "1", 0), human("B", "2", 0)]);
        assert_eq!(kill.victim, human("C", "3", 1));
        assert_eq!(kill.weapon, "Weapon_X");
    }

    #[test]
    fn bot_victim_has_no_identity() {
        let event = parse_one(
            "LogGameplayEvents: Display: A[76561198000000001, team 0] killed Rifleman[INVALID, team 1] with BP_Firearm_M16A4_C_2147481234",
        );
        let Some(Event::Kill(kill)) = event else {
            panic!("expected a kill");
        };
        assert!(kill.victim.is_bot());
        assert!(!kill.attackers[0].is_bot());
    }

    #[test]
    fn incomplete_kill_is_dropped() {
        assert_eq!(
            parse_one("LogGameplayEvents: Display: A[1, team 0] killed C[3, team 1]"),
            None
        );
        assert_eq!(
            parse_one("LogGameplayEvents: Display: A[1, team zero] killed C[3, team 1] with X"),
            None
        );
    }

    #[test]
    fn parses_objective_with_all_players() {
        let event = parse_one(
            "LogGameplayEvents: Display: Objective 2 owned by team 1 was captured for team 0 by A[1], B[2, team 0].",
        );
        let Some(Event::ObjectiveCaptured(objective)) = event else {
            panic!("expected a capture, got {event:?}");
        };
        assert_eq!(objective.objective, 2);
        assert_eq!(objective.owning_team, 1);
        assert_eq!(objective.for_team, 0);
        assert_eq!(objective.players.len(), 2);

        let event = parse_one(
            "LogGameplayEvents: Display: Objective 3 owned by team 0 was destroyed for team 1 by A[1].",
        );
        assert!(matches!(event, Some(Event::ObjectiveDestroyed(_))));
    }

    #[test]
    fn parses_rounds() {
        assert_eq!(
            parse_one("LogGameplayEvents: Display: Round 2 started"),
            Some(Event::RoundStart { round: 2 })
        );
        assert_eq!(
            parse_one("LogGameplayEvents: Display: Round 1 Over: Team 1 won (win reason: Elimination)"),
            Some(Event::RoundEnd(RoundEnd {
                round: 1,
                winner_team: Some(1),
                reason: Some("Elimination".to_owned()),
            }))
        );
    }

    #[test]
    fn parses_map_changes() {
        let event = parse_one(
            "LogGameMode: ProcessServerTravel: Farmhouse?Scenario=Scenario_Farmhouse_Push_Insurgents?MaxPlayers=28",
        );
        let Some(Event::MapTravel(change)) = event else {
            panic!("expected a travel");
        };
        assert_eq!(change.map, "Farmhouse");
        assert_eq!(change.mode, "Push");
        assert_eq!(change.side.as_deref(), Some("Insurgents"));

        let event = parse_one(
            "LogLoad: LoadMap: /Game/Maps/Town/Town?Scenario=Scenario_Hideout_Checkpoint_Security?MaxPlayers=28",
        );
        assert!(matches!(event, Some(Event::MapLoad(_))));
    }

    #[test]
    fn parses_connection_lines() {
        let expected = PlayerIdentity {
            platform_id: "76561198000000001".to_owned(),
            name: "Foo Bar".to_owned(),
        };
        assert_eq!(
            parse_one("LogNet: Login request: ?Name=Foo Bar?SplitscreenCount=1 userId: SteamNWI:76561198000000001 platform: SteamNWI"),
            Some(Event::LoginRequest(expected.clone()))
        );
        assert_eq!(
            parse_one("LogOnlineSession: Display: Registered player Foo Bar (SteamNWI:76561198000000001)"),
            Some(Event::PlayerRegister(expected.clone()))
        );
        assert_eq!(
            parse_one("LogNet: Join succeeded: Foo Bar (SteamNWI:76561198000000001)"),
            Some(Event::PlayerJoin(expected.clone()))
        );
        assert_eq!(
            parse_one("LogNet: Player disconnected: Foo Bar (SteamNWI:76561198000000001)"),
            Some(Event::PlayerDisconnect(expected))
        );
        assert_eq!(parse_one("LogNet: Join succeeded: Foo Bar"), None);
    }

    #[test]
    fn parses_chat_commands_from_fixed_set() {
        let event = parse_one("LogChat: Display: Foo(76561198000000001) Global Chat: !stats");
        let Some(Event::ChatCommand(chat)) = event else {
            panic!("expected a chat command");
        };
        assert_eq!(chat.command, ChatCommand::Stats);
        assert_eq!(chat.player.platform_id, "76561198000000001");
        assert_eq!(chat.player.name, "Foo");

        assert_eq!(
            parse_one("LogChat: Display: Foo(76561198000000001) Global Chat: !dance"),
            None
        );
        assert_eq!(
            parse_one("LogChat: Display: Foo(76561198000000001) Team Chat: hello"),
            None
        );
    }

    #[test]
    fn parses_log_file_open() {
        let event = parse("Log file open, 01/15/24 12:00:00\n", &ParseContext::default()).unwrap();
        let opened_at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(event.event, Event::LogFileOpen { opened_at });
    }

    #[test]
    fn suppresses_disconnects_shortly_after_travel() {
        let travel = Utc.with_ymd_and_hms(2024, 1, 15, 11, 59, 55).unwrap();
        let ctx = ParseContext {
            last_travel_at: Some(travel),
            disconnect_grace: TimeDelta::seconds(15),
        };
        let line = format!("{TS}LogNet: Player disconnected: Foo (SteamNWI:76561198000000001)");
        assert_eq!(parse(&line, &ctx), None);

        let ctx = ParseContext {
            last_travel_at: Some(travel - TimeDelta::minutes(5)),
            ..ctx
        };
        assert!(parse(&line, &ctx).is_some());
    }

    #[test]
    fn ignores_unknown_lines() {
        assert_eq!(parse_one("LogStreaming: Display: something"), None);
        assert_eq!(parse("", &ParseContext::default()), None);
        assert_eq!(parse("garbage \u{fffd} line", &ParseContext::default()), None);
    }

    #[test]
    fn detects_liveness_markers() {
        let line = format!("{TS}LogRcon: 127.0.0.1:51234 << listplayers");
        assert!(liveness_marker_timestamp(&line).is_some());
        assert!(liveness_marker_timestamp(&format!("{TS}LogNet: x")).is_none());
    }
}
