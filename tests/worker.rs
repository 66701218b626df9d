mod common;

use async_trait::async_trait;
use common::*;
use matchstats_service::adapters::rcon::CommandSender;
use matchstats_service::workers::daemons::log_watcher::activity::{
    ActivityChange, ActivityEvent, ActivityListener,
};
use matchstats_service::workers::daemons::log_watcher::worker::ServerWorker;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingListener {
    changes: Mutex<Vec<ActivityChange>>,
}

impl RecordingListener {
    fn changes(&self) -> Vec<ActivityChange> {
        self.changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityListener for RecordingListener {
    async fn on_activity(&self, event: &ActivityEvent<'_>) {
        assert_eq!(event.external_id, EXTERNAL_ID);
        self.changes.lock().unwrap().push(event.change);
    }
}

#[derive(Default)]
struct RecordingSender {
    commands: Mutex<Vec<String>>,
}

impl RecordingSender {
    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSender for RecordingSender {
    async fn send_command(&self, server_id: &str, command: &str) -> anyhow::Result<String> {
        assert_eq!(server_id, EXTERNAL_ID);
        self.commands.lock().unwrap().push(command.to_owned());
        Ok(String::new())
    }
}

#[tokio::test]
async fn worker_reports_activity_edges_and_drains_on_shutdown() {
    let fixture = Fixture::new();
    let state = fixture.load_state().await;
    let listener = Arc::new(RecordingListener::default());
    let listeners: Arc<[Arc<dyn ActivityListener>]> =
        Arc::new([listener.clone() as Arc<dyn ActivityListener>]);
    let worker = ServerWorker::new(
        fixture.processor.clone(),
        state,
        fixture.path().to_path_buf(),
        listeners,
        Duration::from_millis(20),
        Duration::from_millis(300),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(worker.run(rx));

    let mut lines = vec![line(at(0), TRAVEL)];
    lines.extend(lobby(20));
    fixture.write(&lines);
    tx.send(()).unwrap();

    assert!(wait_for(|| listener.changes() == [ActivityChange::Activated]).await);
    assert_eq!(fixture.store.matches().len(), 1);
    assert_eq!(fixture.store.player_count(), 3);

    // no new lines: the idle check flips the server back
    assert!(
        wait_for(|| listener.changes() == [ActivityChange::Activated, ActivityChange::Deactivated])
            .await
    );

    fixture.write(&[line(
        at(60),
        &kill(&[("Alpha", A, 0)], ("Charlie", C, 1), "BP_Firearm_M16A4_C_1"),
    )]);
    drop(tx);
    let state = handle.await.unwrap();

    let end = std::fs::metadata(fixture.path()).unwrap().len();
    assert_eq!(state.position(), end);
    let match_id = state.ongoing_match_id().unwrap();
    assert_eq!(fixture.store.player_stat(match_id, A).unwrap().kills, 1);
    assert_eq!(
        listener.changes(),
        [
            ActivityChange::Activated,
            ActivityChange::Deactivated,
            ActivityChange::Activated,
            ActivityChange::Deactivated,
        ]
    );
}

#[tokio::test]
async fn chat_commands_are_answered_live_only() {
    let sender = Arc::new(RecordingSender::default());
    let fixture = Fixture::with_commands(Some(sender.clone() as Arc<dyn CommandSender>));
    let mut lines = vec![line(at(0), TRAVEL)];
    lines.extend(lobby(20));
    lines.extend([
        line(
            at(60),
            &kill(&[("Alpha", A, 0)], ("Charlie", C, 1), "BP_Firearm_M16A4_C_1"),
        ),
        line(
            at(70),
            "LogChat: Display: Alpha(76561198000000001) Global Chat: !stats",
        ),
    ]);
    fixture.write(&lines);

    let mut state = fixture.load_state().await;
    state.replaying = true;
    fixture.ingest(&mut state).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sender.commands().is_empty());

    state.replaying = false;
    fixture.write(&[line(
        at(80),
        "LogChat: Display: Alpha(76561198000000001) Global Chat: !stats",
    )]);
    fixture.ingest(&mut state).await;
    assert!(wait_for(|| !sender.commands().is_empty()).await);
    assert_eq!(
        sender.commands(),
        ["say Alpha: 1 kills, 0 assists, 0 deaths, score 0"]
    );
}
