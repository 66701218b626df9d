//! In-game chat commands, answered with a `say` over RCON.

mod stats;

use crate::common::error::ServiceResult;
use crate::common::store::StatStore;
use crate::models::events::{ChatCommand, ChatCommandEvent};
use crate::models::servers::ServerState;

pub const COMMAND_PREFIX: &str = "!";

pub type CommandResult = ServiceResult<String>;

pub async fn handle_command(
    store: &dyn StatStore,
    state: &ServerState,
    chat: &ChatCommandEvent,
) -> CommandResult {
    match chat.command {
        ChatCommand::Stats => stats::match_stats(store, state, &chat.player).await,
        ChatCommand::Kdr => stats::kdr(store, &chat.player).await,
        ChatCommand::Top => stats::top(store, state).await,
    }
}
