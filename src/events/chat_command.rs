use crate::adapters::rcon::say_command;
use crate::commands;
use crate::events::{EventContext, EventResult};
use crate::models::events::ChatCommandEvent;
use crate::models::servers::ServerState;
use tracing::{debug, warn};

/// Replies go out on their own task so a slow RCON never stalls the log.
pub async fn handle(ctx: &EventContext, state: &mut ServerState, chat: ChatCommandEvent) -> EventResult {
    if state.replaying {
        return Ok(());
    }
    let Some(sender) = ctx.commands.clone() else {
        debug!(command = chat.command.as_str(), "No RCON configured, not replying");
        return Ok(());
    };

    let answer = commands::handle_command(ctx.store(), state, &chat).await?;
    let server_id = state.external_id().to_owned();
    let timeout = ctx.rcon_timeout;
    tokio::spawn(async move {
        let command = say_command(&answer);
        match tokio::time::timeout(timeout, sender.send_command(&server_id, &command)).await {
            Ok(Ok(_)) => debug!(
                server_id = %server_id,
                command = chat.command.as_str(),
                "Replied to chat command"
            ),
            Ok(Err(e)) => warn!(server_id = %server_id, "Failed to reply to chat command: {e:?}"),
            Err(_) => warn!(server_id = %server_id, "Timed out replying to chat command"),
        }
    });
    Ok(())
}
