#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use matchstats_service::adapters::rcon::CommandSender;
use matchstats_service::entities::servers::UpsertServerArgs;
use matchstats_service::events::EventContext;
use matchstats_service::ingest::LogProcessor;
use matchstats_service::models::servers::ServerState;
use matchstats_service::repositories::memory::MemoryStore;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const EXTERNAL_ID: &str = "eu-1";
pub const A: &str = "76561198000000001";
pub const B: &str = "76561198000000002";
pub const C: &str = "76561198000000003";

pub const TRAVEL: &str =
    "LogGameMode: ProcessServerTravel: Farmhouse?Scenario=Scenario_Farmhouse_Push_Insurgents?MaxPlayers=28";
pub const LOAD: &str =
    "LogLoad: LoadMap: /Game/Maps/Farmhouse/Farmhouse?Scenario=Scenario_Farmhouse_Push_Insurgents?MaxPlayers=28";
pub const GAME_OVER: &str = "LogSession: Display: AINSGameSession::HandleMatchHasEnded";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::seconds(secs)
}

pub fn line(at: DateTime<Utc>, body: &str) -> String {
    format!("{}{body}", at.format("[%Y.%m.%d-%H.%M.%S:%3f][  0]"))
}

pub fn register(name: &str, platform_id: &str) -> String {
    format!("LogOnlineSession: Display: Registered player {name} (SteamNWI:{platform_id})")
}

pub fn join(name: &str, platform_id: &str) -> String {
    format!("LogNet: Join succeeded: {name} (SteamNWI:{platform_id})")
}

pub fn kill(attackers: &[(&str, &str, i32)], victim: (&str, &str, i32), weapon: &str) -> String {
    let attackers: Vec<String> = attackers
        .iter()
        .map(|(name, id, team)| format!("{name}[{id}, team {team}]"))
        .collect();
    let (name, id, team) = victim;
    format!(
        "LogGameplayEvents: Display: {} killed {name}[{id}, team {team}] with {weapon}",
        attackers.join(" + ")
    )
}

pub fn disconnect(name: &str, platform_id: &str) -> String {
    format!("LogNet: Player disconnected: {name} (SteamNWI:{platform_id})")
}

pub fn round_over(round: i32, winner: i32) -> String {
    format!("LogGameplayEvents: Display: Round {round} Over: Team {winner} won (win reason: Elimination)")
}

/// Registers and joins the three regular players, one second apart from `from`.
pub fn lobby(from: i64) -> Vec<String> {
    let mut lines = vec![];
    for (offset, (name, id)) in [("Alpha", A), ("Bravo", B), ("Charlie", C)].iter().enumerate() {
        let secs = from + offset as i64;
        lines.push(line(at(secs), &register(name, id)));
        lines.push(line(at(secs), &join(name, id)));
    }
    lines
}

/// Polls `condition` for up to five seconds.
pub async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

pub fn append(path: &Path, lines: &[String]) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub processor: LogProcessor,
    pub log: tempfile::NamedTempFile,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_commands(None)
    }

    pub fn with_commands(commands: Option<Arc<dyn CommandSender>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let processor = LogProcessor::new(EventContext {
            store: store.clone(),
            commands,
            rcon_timeout: Duration::from_secs(5),
        });
        Self {
            store,
            processor,
            log: tempfile::NamedTempFile::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn write(&self, lines: &[String]) {
        append(self.path(), lines);
    }

    /// State as a freshly started worker would restore it.
    pub async fn load_state(&self) -> ServerState {
        let log_path = self.path().to_string_lossy();
        let args = UpsertServerArgs {
            external_id: EXTERNAL_ID,
            name: "EU #1",
            log_path: &log_path,
        };
        self.processor
            .load_state(&args, TimeDelta::seconds(15))
            .await
            .unwrap()
    }

    pub async fn ingest(&self, state: &mut ServerState) -> usize {
        self.processor
            .process_file(state, self.path())
            .await
            .unwrap()
    }
}
