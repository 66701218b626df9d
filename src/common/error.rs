use tracing::{error, warn};

pub type ServiceResult<T> = Result<T, AppError>;

#[track_caller]
pub fn unexpected<T, E: Into<anyhow::Error>>(e: E) -> ServiceResult<T> {
    let caller = std::panic::Location::caller();
    error!("An unexpected error has occurred at {caller}: {}", e.into());
    Err(AppError::Unexpected)
}

/// Awaits a store operation, retrying it once when the first attempt fails.
/// The expression is evaluated again for the retry, so it must be side-effect free
/// until awaited.
#[macro_export]
macro_rules! retry_once {
    ($op:literal, $e:expr) => {
        match $e.await {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(operation = $op, "Store operation failed, retrying once: {e:?}");
                $e.await
            }
        }
    };
}

#[derive(Debug)]
pub enum AppError {
    Unexpected,

    LogsUnreadable,
    LogsPositionUnsaved,

    MatchesNoneOngoing,

    PlayersNotFound,
    PlayersBot,

    RconTimedOut,
    RconFailed,
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    #[track_caller]
    fn from(e: E) -> Self {
        unexpected::<(), E>(e).unwrap_err()
    }
}

impl AppError {
    pub const fn as_str(&self) -> &str {
        self.code()
    }

    pub const fn code(&self) -> &'static str {
        match self {
            AppError::Unexpected => "unexpected",

            AppError::LogsUnreadable => "logs.unreadable",
            AppError::LogsPositionUnsaved => "logs.position_unsaved",

            AppError::MatchesNoneOngoing => "matches.none_ongoing",

            AppError::PlayersNotFound => "players.not_found",
            AppError::PlayersBot => "players.bot",

            AppError::RconTimedOut => "rcon.timed_out",
            AppError::RconFailed => "rcon.failed",
        }
    }

    pub const fn message(&self) -> &'static str {
        match self {
            AppError::Unexpected => "An unexpected error has occurred.",

            AppError::LogsUnreadable => "The server log could not be read.",
            AppError::LogsPositionUnsaved => "The log position could not be saved.",

            AppError::MatchesNoneOngoing => "The server has no ongoing match.",

            AppError::PlayersNotFound => "The player is not known yet.",
            AppError::PlayersBot => "Bots do not have player records.",

            AppError::RconTimedOut => "The RCON command timed out.",
            AppError::RconFailed => "The RCON command failed.",
        }
    }

    /// Errors that are part of normal operation and only worth a debug line.
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            AppError::MatchesNoneOngoing | AppError::PlayersNotFound | AppError::PlayersBot
        )
    }

    pub fn log(&self, context: &str) {
        if self.is_expected() {
            tracing::debug!(code = self.code(), "{context}: {}", self.message());
        } else {
            warn!(code = self.code(), "{context}: {}", self.message());
        }
    }
}
