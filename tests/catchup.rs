mod common;

use chrono::{DateTime, TimeDelta, Utc};
use common::*;
use matchstats_service::parser;
use matchstats_service::settings::CatchupSettings;
use matchstats_service::workers::daemons::log_watcher::catchup;
use std::time::SystemTime;

fn ago(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    now - TimeDelta::seconds(secs)
}

fn set_modified(fixture: &Fixture, at: DateTime<Utc>) {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(fixture.path())
        .unwrap();
    file.set_modified(SystemTime::from(at)).unwrap();
}

fn previous_session(now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        line(ago(now, 7200), LOAD),
        line(ago(now, 7100), &register("Alpha", A)),
        line(ago(now, 7100), &join("Alpha", A)),
        line(
            ago(now, 7000),
            &kill(&[("Alpha", A, 0)], ("Rifleman", "INVALID", 1), "BP_Firearm_M4A1_C_1"),
        ),
    ];
    lines.push(line(
        ago(now, 120),
        "LogGameMode: ProcessServerTravel: Hideout?Scenario=Scenario_Hideout_Checkpoint_Security?MaxPlayers=28",
    ));
    lines
}

#[tokio::test]
async fn live_server_replays_from_its_last_travel() {
    let now = Utc::now();
    let fixture = Fixture::new();
    let mut lines = previous_session(now);
    lines.extend([
        line(ago(now, 100), &register("Bravo", B)),
        line(ago(now, 100), &join("Bravo", B)),
        line(ago(now, 99), &register("Charlie", C)),
        line(ago(now, 99), &join("Charlie", C)),
        line(
            ago(now, 60),
            &kill(&[("Bravo", B, 0)], ("Charlie", C, 1), "BP_Firearm_AKM_C_4"),
        ),
        line(ago(now, 10), "LogRcon: 127.0.0.1:51234 << listplayers"),
    ]);
    fixture.write(&lines);
    set_modified(&fixture, ago(now, 45));
    let travel_at = parser::line_timestamp(&lines[4]).unwrap();

    let mut state = fixture.load_state().await;
    assert!(!state.has_position());
    catchup::run(
        &fixture.processor,
        &mut state,
        fixture.path(),
        &CatchupSettings::default(),
        now,
    )
    .await
    .unwrap();

    let end = std::fs::metadata(fixture.path()).unwrap().len();
    assert_eq!(state.position(), end);
    assert!(!state.replaying);

    // only the match since the travel was reconstructed
    let matches = fixture.store.matches();
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.started_at, travel_at);
    assert_eq!(m.map, "Hideout");
    assert_eq!(state.ongoing_match_id(), Some(m.id));
    assert!(fixture.store.player(A).is_none());
    assert_eq!(fixture.store.player_stat(m.id, B).unwrap().kills, 1);
    assert_eq!(fixture.store.player_stat(m.id, C).unwrap().deaths, 1);

    // a restart resumes at the saved position without reprocessing
    let mut restored = fixture.load_state().await;
    assert_eq!(restored.position(), end);
    catchup::run(
        &fixture.processor,
        &mut restored,
        fixture.path(),
        &CatchupSettings::default(),
        now,
    )
    .await
    .unwrap();
    assert_eq!(fixture.ingest(&mut restored).await, 0);
    assert_eq!(fixture.store.player_stat(m.id, B).unwrap().kills, 1);
    assert_eq!(fixture.store.matches().len(), 1);
}

#[tokio::test]
async fn stale_log_is_skipped_to_its_end() {
    let now = Utc::now();
    let fixture = Fixture::new();
    fixture.write(&previous_session(now - TimeDelta::hours(8)));
    set_modified(&fixture, ago(now, 7 * 3600));

    let mut state = fixture.load_state().await;
    catchup::run(
        &fixture.processor,
        &mut state,
        fixture.path(),
        &CatchupSettings::default(),
        now,
    )
    .await
    .unwrap();

    let end = std::fs::metadata(fixture.path()).unwrap().len();
    assert_eq!(state.position(), end);
    assert!(fixture.store.matches().is_empty());
    assert_eq!(fixture.store.player_count(), 0);
    assert_eq!(
        fixture.store.server(EXTERNAL_ID).unwrap().log_offset,
        Some(end)
    );
}

#[tokio::test]
async fn rotation_while_down_crashes_the_ongoing_match() {
    let now = Utc::now();
    let fixture = Fixture::new();
    let mut lines = vec!["Log file open, 01/15/24 12:00:00".to_owned()];
    lines.extend([
        line(at(10), TRAVEL),
        line(at(20), &register("Alpha", A)),
        line(at(20), &join("Alpha", A)),
    ]);
    fixture.write(&lines);
    let mut state = fixture.load_state().await;
    fixture.ingest(&mut state).await;
    let first = state.ongoing_match_id().unwrap();

    // the game server restarted with a new log, long before we came back
    let reopened = format!(
        "Log file open, {}\n{}\n",
        ago(now, 7 * 3600).format("%m/%d/%y %H:%M:%S"),
        line(ago(now, 7 * 3600), LOAD)
    );
    std::fs::write(fixture.path(), reopened).unwrap();
    set_modified(&fixture, ago(now, 7 * 3600));

    let mut restored = fixture.load_state().await;
    assert_eq!(restored.ongoing_match_id(), Some(first));
    catchup::run(
        &fixture.processor,
        &mut restored,
        fixture.path(),
        &CatchupSettings::default(),
        now,
    )
    .await
    .unwrap();

    let matches = fixture.store.matches();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].status, "crashed");
    assert_eq!(
        fixture.store.player_stat(first, A).unwrap().status,
        "disconnected"
    );
    assert!(restored.ongoing.is_none());
    assert_eq!(
        restored.position(),
        std::fs::metadata(fixture.path()).unwrap().len()
    );
}
