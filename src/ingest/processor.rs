use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::common::store::StatStore;
use crate::entities::servers::UpsertServerArgs;
use crate::events::{self, EventContext};
use crate::ingest::tail;
use crate::models::servers::ServerState;
use crate::parser;
use crate::retry_once;
use crate::usecases::matches;
use crate::workers::daemons::score_debouncer::ScoreTrigger;
use chrono::TimeDelta;
use std::path::Path;
use tracing::{debug, info, warn};

const READ_BATCH_LINES: usize = 1024;

/// Applies log lines of one server to the store, in order, exactly once.
///
/// The persisted log position is the watermark: a line whose end offset is not
/// past it has already been applied and is skipped. Lines re-read behind a lost
/// watermark are absorbed by the store, which keys every log-driven write on the
/// line's log offset.
#[derive(Clone)]
pub struct LogProcessor {
    ctx: EventContext,
    score_trigger: Option<ScoreTrigger>,
}

impl LogProcessor {
    pub fn new(ctx: EventContext) -> Self {
        Self {
            ctx,
            score_trigger: None,
        }
    }

    pub fn with_score_trigger(mut self, score_trigger: ScoreTrigger) -> Self {
        self.score_trigger = Some(score_trigger);
        self
    }

    pub fn context(&self) -> &EventContext {
        &self.ctx
    }

    pub fn store(&self) -> &dyn StatStore {
        self.ctx.store()
    }

    /// Registers the server and restores what its worker needs to resume.
    pub async fn load_state(
        &self,
        args: &UpsertServerArgs<'_>,
        disconnect_grace: TimeDelta,
    ) -> ServiceResult<ServerState> {
        let server = match retry_once!("upsert_server", self.store().upsert_server(args)) {
            Ok(server) => server,
            Err(e) => return unexpected(e),
        };
        let ongoing = matches::load_ongoing(self.store(), server.id).await?;
        let applied_floor = match retry_once!(
            "fetch_applied_offset",
            self.store().fetch_applied_offset(server.id)
        ) {
            Ok(applied_offset) => applied_offset,
            Err(e) => return unexpected(e),
        };
        debug!(
            server_id = %server.external_id,
            log_offset = server.log_offset,
            log_base = server.log_base,
            applied_floor,
            ongoing_match_id = ongoing.as_ref().map(|m| m.id),
            "Loaded server state"
        );
        Ok(ServerState::new(server, ongoing, applied_floor, disconnect_grace))
    }

    /// Applies one line that ends at byte `end_offset` of the log.
    /// Returns whether the line produced an event.
    ///
    /// Fails without applying anything more when the position after the line
    /// could not be saved; the caller retries on its next read.
    pub async fn process_line(
        &self,
        state: &mut ServerState,
        line: &str,
        end_offset: u64,
    ) -> ServiceResult<bool> {
        if end_offset <= state.position() {
            return Ok(false);
        }
        let line_offset = state.log_offset_of(end_offset);
        if line_offset < state.applied_floor {
            state.advance(end_offset);
            return Ok(false);
        }
        let Some(event) = parser::parse(line, &state.parse_context()) else {
            state.advance(end_offset);
            return Ok(false);
        };

        let name = event.event.name();
        let affects_score = event.event.affects_score();
        state.line_offset = line_offset;
        if let Err(e) = events::handle_event(&self.ctx, state, event).await {
            e.log(&format!("Dropping {name} event"));
        }
        state.applied_floor = line_offset;
        state.advance(end_offset);

        if affects_score && !state.replaying {
            if let Some(trigger) = &self.score_trigger {
                trigger.trigger();
            }
        }
        self.save_position(state).await?;
        Ok(true)
    }

    /// Applies every complete line between the saved position and the end of the log.
    /// Returns the number of lines that produced an event.
    pub async fn process_file(&self, state: &mut ServerState, path: &Path) -> ServiceResult<usize> {
        if !state.position_saved {
            self.save_position(state).await?;
        }
        self.detect_rotation(state, path).await?;

        let mut applied = 0;
        loop {
            let lines = match tail::read_lines(path, state.position(), READ_BATCH_LINES).await {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(server_id = state.external_id(), "Failed to read log: {e}");
                    return Err(AppError::LogsUnreadable);
                }
            };
            let Some(last) = lines.last() else {
                break;
            };
            let batch_end = last.end_offset;
            let full_batch = lines.len() == READ_BATCH_LINES;

            for line in &lines {
                if self.process_line(state, &line.text, line.end_offset).await? {
                    applied += 1;
                }
            }
            state.advance(batch_end);
            self.save_position(state).await?;

            if !full_batch {
                break;
            }
        }
        Ok(applied)
    }

    /// A log that shrank below the saved position, or whose open stamp changed,
    /// is a new generation and is read from the start.
    async fn detect_rotation(&self, state: &mut ServerState, path: &Path) -> ServiceResult<()> {
        let len = match tail::file_len(path).await {
            Ok(len) => len,
            Err(e) => {
                warn!(server_id = state.external_id(), "Failed to stat log: {e}");
                return Err(AppError::LogsUnreadable);
            }
        };
        if state.position() == 0 {
            return Ok(());
        }

        let stamp = tail::read_open_stamp(path).await.ok().flatten();
        let reopened = matches!(
            (state.server.log_opened_at, stamp),
            (Some(saved), Some(current)) if saved != current
        );
        if len < state.position() || reopened {
            info!(
                server_id = state.external_id(),
                len,
                position = state.position(),
                reopened,
                "Log rotated, reading from the start"
            );
            state.reset_position();
        } else if state.server.log_opened_at.is_none() {
            state.server.log_opened_at = stamp;
        }
        Ok(())
    }

    pub async fn save_position(&self, state: &mut ServerState) -> ServiceResult<()> {
        let Some(offset) = state.server.log_offset else {
            return Ok(());
        };
        let log_base = state.server.log_base;
        let opened_at = state.server.log_opened_at;
        if let Err(e) = retry_once!(
            "save_log_position",
            self.store()
                .save_log_position(state.server_id(), log_base, offset, opened_at)
        ) {
            warn!(
                server_id = state.external_id(),
                offset, "Failed to save log position: {e:?}"
            );
            return Err(AppError::LogsPositionUnsaved);
        }
        state.position_saved = true;
        Ok(())
    }
}
