pub mod activity;
pub mod catchup;
pub mod worker;

use crate::adapters::rcon::CommandSender;
use crate::common::init;
use crate::common::store::StatStore;
use crate::entities::servers::UpsertServerArgs;
use crate::events::EventContext;
use crate::ingest::LogProcessor;
use crate::models::servers::ServerState;
use crate::settings::{AppSettings, IngestSettings, ServerConfig, load_server_configs};
use crate::usecases::scores;
use crate::workers::crons::rcon_poll::RconPoller;
use crate::workers::daemons::score_debouncer::{self, DebounceWindow};
use activity::{ActivityListener, ActivityPublisher};
use chrono::{TimeDelta, Utc};
use hashbrown::HashMap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use worker::ServerWorker;

#[derive(Debug, Clone)]
pub struct WatchedServer {
    pub external_id: String,
    pub name: String,
    pub log_path: PathBuf,
}

impl From<&ServerConfig> for WatchedServer {
    fn from(config: &ServerConfig) -> Self {
        Self {
            external_id: config.external_id(),
            name: config.name.clone(),
            log_path: config.log_path.clone(),
        }
    }
}

struct RunningServer {
    external_id: String,
    worker: JoinHandle<ServerState>,
    debouncer: Option<JoinHandle<()>>,
}

/// Tails every configured log with one worker per server.
pub struct LogWatcher {
    watcher: RecommendedWatcher,
    router: JoinHandle<()>,
    servers: Vec<RunningServer>,
    poller: Option<Arc<RconPoller>>,
}

impl LogWatcher {
    /// Restores each server, runs its catch-up and starts tailing. A server that
    /// fails to start is logged and left out; the others are unaffected.
    pub async fn start(
        ctx: EventContext,
        servers: Vec<WatchedServer>,
        mut listeners: Vec<Arc<dyn ActivityListener>>,
        settings: &IngestSettings,
    ) -> anyhow::Result<Self> {
        let poller = ctx.commands.clone().map(|commands| {
            Arc::new(RconPoller::new(
                ctx.store.clone(),
                commands,
                settings.poll_interval,
                ctx.rcon_timeout,
            ))
        });
        if let Some(poller) = &poller {
            listeners.push(poller.clone());
        }
        let listeners: Arc<[Arc<dyn ActivityListener>]> = listeners.into();
        let grace = TimeDelta::from_std(settings.disconnect_grace)?;

        let mut routes = HashMap::new();
        let mut watch_dirs = vec![];
        let mut running = vec![];
        for server in servers {
            let Some(route) = route_key(&server.log_path) else {
                error!(
                    server_id = %server.external_id,
                    path = %server.log_path.display(),
                    "Log directory is not accessible"
                );
                continue;
            };

            let mut processor = LogProcessor::new(ctx.clone());
            let log_path = server.log_path.to_string_lossy();
            let args = UpsertServerArgs {
                external_id: &server.external_id,
                name: &server.name,
                log_path: &log_path,
            };
            let mut state = match processor.load_state(&args, grace).await {
                Ok(state) => state,
                Err(e) => {
                    e.log(&format!("Failed to load server {}", server.external_id));
                    continue;
                }
            };

            let mut debouncer = None;
            if let Some(commands) = ctx.commands.clone() {
                let store = ctx.store.clone();
                let server_id = state.server_id();
                let external_id = server.external_id.clone();
                let rcon_timeout = ctx.rcon_timeout;
                let window = DebounceWindow {
                    quiet: settings.debounce_window,
                    max_wait: settings.debounce_max_wait,
                };
                let (trigger, handle) = score_debouncer::spawn(window, move || {
                    reconcile_task(
                        store.clone(),
                        commands.clone(),
                        server_id,
                        external_id.clone(),
                        rcon_timeout,
                    )
                });
                processor = processor.with_score_trigger(trigger);
                debouncer = Some(handle);
            }

            let now = Utc::now();
            if let Err(e) =
                catchup::run(&processor, &mut state, &server.log_path, &settings.catchup, now).await
            {
                e.log(&format!("Catch-up failed for {}", server.external_id));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let worker = ServerWorker::new(
                processor,
                state,
                server.log_path.clone(),
                listeners.clone(),
                settings.coalesce_window,
                settings.inactivity_period,
            );
            running.push(RunningServer {
                external_id: server.external_id.clone(),
                worker: tokio::spawn(worker.run(rx)),
                debouncer,
            });

            if let Some(dir) = route.parent() {
                if !watch_dirs.iter().any(|watched: &PathBuf| watched == dir) {
                    watch_dirs.push(dir.to_path_buf());
                }
            }
            routes.insert(route, tx);
        }

        let (notify_tx, notify_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |result| {
            if notify_tx.send(result).is_err() {
                debug!("Log watcher notification receiver dropped");
            }
        })?;
        for dir in &watch_dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        let router = tokio::spawn(route_notifications(notify_rx, routes));

        info!(servers = running.len(), dirs = watch_dirs.len(), "Watching server logs");
        Ok(Self {
            watcher,
            router,
            servers: running,
            poller,
        })
    }

    /// Stops watching and waits up to `drain` for workers to apply what is already written.
    pub async fn shutdown(self, drain: Duration) {
        // the notify callback owns the router's sender
        drop(self.watcher);
        let deadline = tokio::time::Instant::now() + drain;
        if tokio::time::timeout_at(deadline, self.router).await.is_err() {
            warn!("Notification router did not stop in time");
        }

        for server in self.servers {
            let abort = server.worker.abort_handle();
            match tokio::time::timeout_at(deadline, server.worker).await {
                Ok(Ok(state)) => debug!(
                    server_id = %server.external_id,
                    position = state.position(),
                    "Worker drained"
                ),
                Ok(Err(e)) => error!(server_id = %server.external_id, "Worker failed: {e}"),
                Err(_) => {
                    warn!(server_id = %server.external_id, "Worker did not drain in time, aborting");
                    abort.abort();
                }
            }
            if let Some(debouncer) = server.debouncer {
                debouncer.abort();
            }
        }
        if let Some(poller) = self.poller {
            poller.shutdown();
        }
    }
}

async fn reconcile_task(
    store: Arc<dyn StatStore>,
    commands: Arc<dyn CommandSender>,
    server_id: i64,
    external_id: String,
    rcon_timeout: Duration,
) {
    match scores::reconcile(
        store.as_ref(),
        commands.as_ref(),
        server_id,
        &external_id,
        rcon_timeout,
        Utc::now(),
    )
    .await
    {
        Ok(reconciled) => debug!(server_id = %external_id, reconciled, "Scores reconciled"),
        Err(e) => e.log("Score reconciliation skipped"),
    }
}

/// Notifications carry paths below the watched directory, so routes are keyed
/// by the canonical directory joined with the file name.
fn route_key(log_path: &Path) -> Option<PathBuf> {
    let file_name = log_path.file_name()?;
    let dir = match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Some(dir.canonicalize().ok()?.join(file_name))
}

async fn route_notifications(
    mut notifications: mpsc::UnboundedReceiver<notify::Result<Event>>,
    routes: HashMap<PathBuf, mpsc::UnboundedSender<()>>,
) {
    while let Some(notification) = notifications.recv().await {
        let event = match notification {
            Ok(event) => event,
            Err(e) => {
                warn!("Log watcher error: {e}");
                continue;
            }
        };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            continue;
        }
        for path in &event.paths {
            if let Some(worker) = routes.get(path) {
                // a stopped worker has already drained
                let _ = worker.send(());
            }
        }
    }
}

/// The `ingest` component: catch-up, then tail until ctrl-c.
pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let state = init::initialize_state(settings).await?;
    let configs = load_server_configs(&settings.servers_config_path)?;
    if configs.iter().any(|config| config.rcon_address.is_some()) {
        warn!("No RCON client is linked in, score reconciliation and chat replies are disabled");
    }
    let servers = configs.iter().map(WatchedServer::from).collect();

    let ctx = EventContext {
        store: Arc::new(state.clone()),
        commands: None,
        rcon_timeout: settings.ingest.rcon_timeout,
    };
    let listeners: Vec<Arc<dyn ActivityListener>> = vec![Arc::new(ActivityPublisher::new(state))];
    let watcher = LogWatcher::start(ctx, servers, listeners, &settings.ingest).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down log watcher");
    watcher.shutdown(settings.ingest.shutdown_drain).await;
    Ok(())
}
