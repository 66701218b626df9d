use crate::common::error::ServiceResult;
use crate::common::init;
use crate::entities::servers::UpsertServerArgs;
use crate::events::EventContext;
use crate::ingest::LogProcessor;
use crate::settings::{AppSettings, load_server_configs};
use crate::workers::daemons::log_watcher::WatchedServer;
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The `replay` component: applies each configured log from its saved
/// position to its current end, once, then exits.
pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let state = init::initialize_state(settings).await?;
    let processor = LogProcessor::new(EventContext {
        store: Arc::new(state),
        commands: None,
        rcon_timeout: settings.ingest.rcon_timeout,
    });
    let grace = TimeDelta::from_std(settings.ingest.disconnect_grace)?;

    for config in load_server_configs(&settings.servers_config_path)? {
        let server = WatchedServer::from(&config);
        let started = Instant::now();
        info!(server_id = %server.external_id, "Starting log replay");
        match replay_log(&processor, &server, grace).await {
            Ok(applied) => info!(
                server_id = %server.external_id,
                applied,
                "Completed log replay in {:?}",
                started.elapsed()
            ),
            Err(e) => error!(
                server_id = %server.external_id,
                code = e.code(),
                "Error occurred in log replay: {}",
                e.message()
            ),
        }
    }
    Ok(())
}

pub async fn replay_log(
    processor: &LogProcessor,
    server: &WatchedServer,
    grace: TimeDelta,
) -> ServiceResult<usize> {
    let log_path = server.log_path.to_string_lossy();
    let args = UpsertServerArgs {
        external_id: &server.external_id,
        name: &server.name,
        log_path: &log_path,
    };
    let mut state = processor.load_state(&args, grace).await?;
    state.replaying = true;
    processor.process_file(&mut state, &server.log_path).await
}
