//! Periodic score reconciliation, running only while a server is active.

use crate::adapters::rcon::CommandSender;
use crate::common::store::StatStore;
use crate::usecases::scores;
use crate::workers::daemons::log_watcher::activity::{
    ActivityChange, ActivityEvent, ActivityListener,
};
use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub struct RconPoller {
    store: Arc<dyn StatStore>,
    commands: Arc<dyn CommandSender>,
    interval: Duration,
    timeout: Duration,
    tasks: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl RconPoller {
    pub fn new(
        store: Arc<dyn StatStore>,
        commands: Arc<dyn CommandSender>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            commands,
            interval,
            timeout,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_polling(&self, server_id: i64) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&server_id)
    }

    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }

    fn start(&self, server_id: i64, external_id: &str) {
        let store = self.store.clone();
        let commands = self.commands.clone();
        let external_id = external_id.to_owned();
        let (interval, timeout) = (self.interval, self.timeout);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let polled = scores::reconcile(
                    store.as_ref(),
                    commands.as_ref(),
                    server_id,
                    &external_id,
                    timeout,
                    Utc::now(),
                )
                .await;
                match polled {
                    Ok(reconciled) => {
                        debug!(server_id = %external_id, reconciled, "Periodic score poll")
                    }
                    Err(e) => e.log("Periodic score poll skipped"),
                }
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = tasks.insert(server_id, task) {
            previous.abort();
        }
    }

    fn stop(&self, server_id: i64) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = tasks.remove(&server_id) {
            task.abort();
        }
    }
}

#[async_trait]
impl ActivityListener for RconPoller {
    async fn on_activity(&self, event: &ActivityEvent<'_>) {
        info!(
            server_id = event.external_id,
            active = event.change.is_active(),
            "Toggling periodic score polling"
        );
        match event.change {
            ActivityChange::Activated => self.start(event.server_id, event.external_id),
            ActivityChange::Deactivated => self.stop(event.server_id),
        }
    }
}

impl Drop for RconPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::matches::CreateMatchArgs;
    use crate::entities::servers::UpsertServerArgs;
    use crate::repositories::memory::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scoreboard {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandSender for Scoreboard {
        async fn send_command(&self, _server_id: &str, _command: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("0 | Foo | SteamNWI:76561198000000001 | 10.0.0.2 | 250 |\n\
                1 | Stranger | SteamNWI:76561198000000009 | 10.0.0.3 | 90 |"
                .to_owned())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_only_while_active() {
        let store = Arc::new(MemoryStore::new());
        let server = store
            .upsert_server(&UpsertServerArgs {
                external_id: "eu-1",
                name: "EU",
                log_path: "/tmp/eu-1.log",
            })
            .await
            .unwrap();
        let started_at = Utc::now();
        let m = store
            .create_match(&CreateMatchArgs {
                server_id: server.id,
                map: "Farmhouse",
                mode: "Push",
                side: None,
                max_players: None,
                started_at,
                applied_offset: 1,
            })
            .await
            .unwrap();
        let player = store
            .upsert_player("76561198000000001", "Foo")
            .await
            .unwrap();
        store
            .mark_connected(m.id, player.id, started_at, 1)
            .await
            .unwrap();

        let scoreboard = Arc::new(Scoreboard {
            calls: AtomicUsize::new(0),
        });
        let poller = RconPoller::new(
            store.clone(),
            scoreboard.clone(),
            Duration::from_secs(60),
            Duration::from_secs(30),
        );
        let mut event = ActivityEvent {
            server_id: server.id,
            external_id: "eu-1",
            change: ActivityChange::Activated,
            at: started_at,
        };
        poller.on_activity(&event).await;
        assert!(poller.is_polling(server.id));

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(scoreboard.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.player_stat(m.id, "76561198000000001").unwrap().score, 250);
        // polling never creates players
        assert!(store.player("76561198000000009").is_none());

        event.change = ActivityChange::Deactivated;
        poller.on_activity(&event).await;
        assert!(!poller.is_polling(server.id));
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(scoreboard.calls.load(Ordering::SeqCst), 2);
    }
}
