use crate::entities::matches::Match;
use crate::entities::servers::Server;
use crate::parser::ParseContext;
use chrono::{DateTime, TimeDelta, Utc};
use hashbrown::HashMap;

/// Everything one server's worker owns while processing its log.
#[derive(Debug)]
pub struct ServerState {
    pub server: Server,
    pub ongoing: Option<Match>,
    pub last_travel_at: Option<DateTime<Utc>>,
    /// Last team kill per attacking player in the ongoing match.
    pub last_friendly_fire: HashMap<i64, DateTime<Utc>>,
    /// Login requests not yet followed by a registration, keyed by platform id.
    pub pending_logins: HashMap<String, DateTime<Utc>>,
    /// Set while catch-up replays history: no score polls, no chat replies.
    pub replaying: bool,
    pub disconnect_grace: TimeDelta,
    /// Log offset of the line being applied, counted across log generations.
    pub line_offset: u64,
    /// Lines before this log offset were already applied and are skipped.
    pub applied_floor: u64,
    /// Whether the in-memory position has been persisted.
    pub position_saved: bool,
}

impl ServerState {
    pub fn new(
        server: Server,
        ongoing: Option<Match>,
        applied_floor: u64,
        disconnect_grace: TimeDelta,
    ) -> Self {
        Self {
            server,
            ongoing,
            last_travel_at: None,
            last_friendly_fire: HashMap::new(),
            pending_logins: HashMap::new(),
            replaying: false,
            disconnect_grace,
            line_offset: 0,
            applied_floor,
            position_saved: true,
        }
    }

    pub fn server_id(&self) -> i64 {
        self.server.id
    }

    pub fn external_id(&self) -> &str {
        &self.server.external_id
    }

    /// Byte offset up to which the log has been applied.
    pub fn position(&self) -> u64 {
        self.server.log_offset.unwrap_or(0)
    }

    pub fn has_position(&self) -> bool {
        self.server.log_offset.is_some()
    }

    pub fn advance(&mut self, end_offset: u64) {
        let position = end_offset.max(self.position());
        if self.server.log_offset != Some(position) {
            self.server.log_offset = Some(position);
            self.position_saved = false;
        }
    }

    /// Offset of a line ending at `end_offset` of the current generation,
    /// counted across every generation of the log.
    pub fn log_offset_of(&self, end_offset: u64) -> u64 {
        self.server.log_base + end_offset
    }

    /// The log was rotated or truncated, the next line starts a new generation.
    pub fn reset_position(&mut self) {
        self.server.log_base += self.position();
        self.server.log_offset = Some(0);
        self.server.log_opened_at = None;
        self.position_saved = false;
    }

    pub fn ongoing_match_id(&self) -> Option<i64> {
        self.ongoing.as_ref().map(|m| m.id)
    }

    pub fn begin_match(&mut self, new_match: Match) {
        self.last_friendly_fire.clear();
        self.ongoing = Some(new_match);
    }

    pub fn parse_context(&self) -> ParseContext {
        ParseContext {
            last_travel_at: self.last_travel_at,
            disconnect_grace: self.disconnect_grace,
        }
    }
}
