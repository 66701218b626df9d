use chrono::{DateTime, Utc};

/// One recognised log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LogFileOpen { opened_at: DateTime<Utc> },
    LoginRequest(PlayerIdentity),
    PlayerRegister(PlayerIdentity),
    PlayerJoin(PlayerIdentity),
    PlayerLeave(PlayerIdentity),
    PlayerDisconnect(PlayerIdentity),
    Kill(KillEvent),
    ObjectiveCaptured(ObjectiveEvent),
    ObjectiveDestroyed(ObjectiveEvent),
    RoundStart { round: i32 },
    RoundEnd(RoundEnd),
    MapLoad(MapChange),
    MapTravel(MapChange),
    GameOver,
    ChatCommand(ChatCommandEvent),
}

impl Event {
    pub const fn name(&self) -> &'static str {
        match self {
            Event::LogFileOpen { .. } => "log_file_open",
            Event::LoginRequest(_) => "login_request",
            Event::PlayerRegister(_) => "player_register",
            Event::PlayerJoin(_) => "player_join",
            Event::PlayerLeave(_) => "player_leave",
            Event::PlayerDisconnect(_) => "player_disconnect",
            Event::Kill(_) => "kill",
            Event::ObjectiveCaptured(_) => "objective_captured",
            Event::ObjectiveDestroyed(_) => "objective_destroyed",
            Event::RoundStart { .. } => "round_start",
            Event::RoundEnd(_) => "round_end",
            Event::MapLoad(_) => "map_load",
            Event::MapTravel(_) => "map_travel",
            Event::GameOver => "game_over",
            Event::ChatCommand(_) => "chat_command",
        }
    }

    /// Events after which the live scoreboard is worth reconciling.
    pub const fn affects_score(&self) -> bool {
        matches!(
            self,
            Event::Kill(_)
                | Event::ObjectiveCaptured(_)
                | Event::ObjectiveDestroyed(_)
                | Event::RoundEnd(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub platform_id: String,
    pub name: String,
}

/// An attacker or victim as written in a kill or objective line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerToken {
    pub name: String,
    /// `None` for the bot sentinel.
    pub platform_id: Option<String>,
    pub team: Option<i32>,
}

impl PlayerToken {
    pub fn is_bot(&self) -> bool {
        self.platform_id.is_none()
    }

    /// Two tokens denote the same human.
    pub fn same_player(&self, other: &PlayerToken) -> bool {
        match (&self.platform_id, &other.platform_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillEvent {
    /// Primary attacker first, assisting attackers after it. Never empty.
    pub attackers: Vec<PlayerToken>,
    pub victim: PlayerToken,
    pub weapon: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveEvent {
    pub objective: i32,
    pub owning_team: i32,
    pub for_team: i32,
    pub players: Vec<PlayerToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundEnd {
    pub round: i32,
    pub winner_team: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapChange {
    pub map: String,
    pub scenario: Option<String>,
    pub mode: String,
    pub side: Option<String>,
    pub max_players: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Stats,
    Kdr,
    Top,
}

impl ChatCommand {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "stats" => Some(ChatCommand::Stats),
            "kdr" => Some(ChatCommand::Kdr),
            "top" => Some(ChatCommand::Top),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ChatCommand::Stats => "stats",
            ChatCommand::Kdr => "kdr",
            ChatCommand::Top => "top",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCommandEvent {
    pub player: PlayerIdentity,
    pub command: ChatCommand,
}
