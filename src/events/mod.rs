pub mod chat_command;
pub mod game_over;
pub mod kill;
pub mod log_file_open;
pub mod login;
pub mod map_change;
pub mod objective;
pub mod player_join;
pub mod player_leave;
pub mod round;

use crate::adapters::rcon::CommandSender;
use crate::common::error::ServiceResult;
use crate::common::store::StatStore;
use crate::entities::players::Player;
use crate::models::events::{Event, LogEvent, PlayerToken};
use crate::models::servers::ServerState;
use crate::usecases::players;
use std::sync::Arc;
use std::time::Duration;

/// Collaborators shared by every handler of one server.
#[derive(Clone)]
pub struct EventContext {
    pub store: Arc<dyn StatStore>,
    pub commands: Option<Arc<dyn CommandSender>>,
    pub rcon_timeout: Duration,
}

impl EventContext {
    pub fn store(&self) -> &dyn StatStore {
        self.store.as_ref()
    }
}

pub type EventResult = ServiceResult<()>;

pub async fn handle_event(ctx: &EventContext, state: &mut ServerState, event: LogEvent) -> EventResult {
    let at = event.timestamp;
    match event.event {
        Event::LogFileOpen { opened_at } => log_file_open::handle(ctx, state, opened_at).await,
        Event::LoginRequest(identity) => login::handle_request(state, identity, at),
        Event::PlayerRegister(identity) => login::handle_register(ctx, state, &identity).await,
        Event::PlayerJoin(identity) => player_join::handle(ctx, state, &identity, at).await,
        Event::PlayerLeave(identity) | Event::PlayerDisconnect(identity) => {
            player_leave::handle(ctx, state, &identity, at).await
        }
        Event::Kill(kill) => kill::handle(ctx, state, &kill, at).await,
        Event::ObjectiveCaptured(objective) => {
            objective::handle(ctx, state, &objective, objective::Outcome::Captured).await
        }
        Event::ObjectiveDestroyed(objective) => {
            objective::handle(ctx, state, &objective, objective::Outcome::Destroyed).await
        }
        Event::RoundStart { round } => round::handle_start(ctx, state, round).await,
        Event::RoundEnd(round_end) => round::handle_end(ctx, state, &round_end).await,
        Event::MapLoad(change) => map_change::handle_load(ctx, state, &change, at).await,
        Event::MapTravel(change) => map_change::handle_travel(ctx, state, &change, at).await,
        Event::GameOver => game_over::handle(ctx, state, at).await,
        Event::ChatCommand(chat) => chat_command::handle(ctx, state, chat).await,
    }
}

/// A failed mutation is logged and dropped; the rest of the event still applies.
fn log_dropped(result: EventResult, mutation: &'static str) {
    if let Err(e) = result {
        e.log(mutation);
    }
}

/// The known player behind a token, or `None` for bots and players never seen logging in.
async fn credited_player(ctx: &EventContext, token: &PlayerToken) -> Option<Player> {
    match players::resolve(ctx.store(), token).await {
        Ok(player) => Some(player),
        Err(e) => {
            e.log(&format!("Not crediting {}", token.name));
            None
        }
    }
}
