use crate::ingest::LogProcessor;
use crate::models::servers::ServerState;
use crate::workers::daemons::log_watcher::activity::{
    ActivityChange, ActivityEvent, ActivityListener, ActivityTracker,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Rechecks the log even without notifications: catches missed events and inactivity.
const IDLE_TICK: Duration = Duration::from_secs(1);

/// Sole owner of one server's state. Lines are applied strictly in log order.
pub struct ServerWorker {
    processor: LogProcessor,
    state: ServerState,
    path: PathBuf,
    activity: ActivityTracker,
    listeners: Arc<[Arc<dyn ActivityListener>]>,
    coalesce_window: Duration,
}

impl ServerWorker {
    pub fn new(
        processor: LogProcessor,
        state: ServerState,
        path: PathBuf,
        listeners: Arc<[Arc<dyn ActivityListener>]>,
        coalesce_window: Duration,
        inactivity_period: Duration,
    ) -> Self {
        Self {
            processor,
            state,
            path,
            activity: ActivityTracker::new(inactivity_period),
            listeners,
            coalesce_window,
        }
    }

    /// Runs until the notification sender is dropped, then applies whatever
    /// the log already holds and hands back the final state.
    pub async fn run(mut self, mut notifications: mpsc::UnboundedReceiver<()>) -> ServerState {
        let mut idle = tokio::time::interval(IDLE_TICK);
        idle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = notifications.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tokio::time::sleep(self.coalesce_window).await;
                    while notifications.try_recv().is_ok() {}
                    self.poll().await;
                }
                _ = idle.tick() => self.poll().await,
            }
        }

        self.poll().await;
        if self.activity.is_active() {
            self.notify(ActivityChange::Deactivated).await;
        }
        info!(
            server_id = self.state.external_id(),
            position = self.state.position(),
            "Log worker stopped"
        );
        self.state
    }

    async fn poll(&mut self) {
        let before = self.state.position();
        if let Err(e) = self.processor.process_file(&mut self.state, &self.path).await {
            e.log("Failed to process log");
        }

        let now = Instant::now();
        let change = if self.state.position() != before {
            self.activity.record_activity(now)
        } else {
            self.activity.check_idle(now)
        };
        if let Some(change) = change {
            self.notify(change).await;
        }
    }

    async fn notify(&self, change: ActivityChange) {
        debug!(server_id = self.state.external_id(), ?change, "Server activity changed");
        let event = ActivityEvent {
            server_id: self.state.server_id(),
            external_id: self.state.external_id(),
            change,
            at: Utc::now(),
        };
        for listener in self.listeners.iter() {
            listener.on_activity(&event).await;
        }
    }
}
