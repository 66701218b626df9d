//! First-run reconstruction of a match that was already running.
//!
//! A log that is still being written (modified within the liveness threshold)
//! is replayed from its most recent map change, so the ongoing match, its
//! players and kills exist before live tailing starts. Anything older is
//! skipped and tailing starts at the end of the log.

use crate::common::error::{AppError, ServiceResult};
use crate::ingest::{LogProcessor, tail};
use crate::models::events::Event;
use crate::models::servers::ServerState;
use crate::parser::{self, ParseContext};
use crate::settings::CatchupSettings;
use crate::usecases::matches;
use chrono::{DateTime, TimeDelta, Utc};
use std::io::SeekFrom;
use std::ops::ControlFlow;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncReadExt, AsyncSeekExt};
use tracing::{info, warn};

const SCAN_CHUNK_LEN: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchupPlan {
    /// Replay from the start of the map change line at `from`.
    Replay { from: u64, marker_at: DateTime<Utc> },
    /// Start tailing after the last complete line.
    SkipToEnd { end: u64 },
}

#[derive(Debug, Default)]
struct ScanResult {
    complete_end: Option<u64>,
    liveness_at: Option<DateTime<Utc>>,
    travel: Option<(u64, DateTime<Utc>)>,
    load: Option<(u64, DateTime<Utc>)>,
}

fn delta(duration: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

pub async fn plan(
    path: &Path,
    settings: &CatchupSettings,
    now: DateTime<Utc>,
) -> io::Result<CatchupPlan> {
    let metadata = tokio::fs::metadata(path).await?;
    let modified_at: DateTime<Utc> = metadata.modified()?.into();

    let liveness_window = delta(settings.liveness_window);
    let marker_window = delta(settings.marker_window);
    let scan_from = now - liveness_window.max(marker_window);
    let ctx = ParseContext::default();

    let mut scan = ScanResult::default();
    scan_backward(path, metadata.len(), |line, start, end| {
        scan.complete_end.get_or_insert(end);
        let Some(timestamp) = parser::line_timestamp(line) else {
            return ControlFlow::Continue(());
        };
        if timestamp < scan_from {
            return ControlFlow::Break(());
        }

        if parser::liveness_marker_timestamp(line).is_some() {
            scan.liveness_at.get_or_insert(timestamp);
        } else if let Some(event) = parser::parse(line, &ctx) {
            match event.event {
                Event::MapTravel(_) if scan.travel.is_none() => {
                    scan.travel = Some((start, timestamp));
                }
                Event::MapLoad(_) if scan.load.is_none() => scan.load = Some((start, timestamp)),
                _ => {}
            }
        }
        // the newest travel wins over every load, nothing older matters
        if scan.travel.is_some() && scan.liveness_at.is_some() {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    })
    .await?;

    let end = scan.complete_end.unwrap_or(0);
    let live = scan
        .liveness_at
        .is_some_and(|at| now - at <= liveness_window);
    let threshold = if live {
        delta(settings.short_threshold)
    } else {
        delta(settings.long_threshold)
    };
    if now - modified_at > threshold {
        info!(
            path = %path.display(),
            %modified_at,
            live,
            "Log is stale, starting at its end"
        );
        return Ok(CatchupPlan::SkipToEnd { end });
    }

    let marker = scan
        .travel
        .or(scan.load)
        .filter(|(_, at)| now - *at <= marker_window);
    Ok(match marker {
        Some((from, marker_at)) => CatchupPlan::Replay { from, marker_at },
        None => CatchupPlan::SkipToEnd { end },
    })
}

/// Visits complete lines newest first with their start and end offsets.
/// A trailing line without terminator is skipped.
async fn scan_backward<F>(path: &Path, len: u64, mut visit: F) -> io::Result<()>
where
    F: FnMut(&str, u64, u64) -> ControlFlow<()>,
{
    let mut file = File::open(path).await?;
    let mut region_end = len;
    // tail of the previous chunk: the end of a line whose start is not read yet
    let mut carry: Vec<u8> = vec![];
    let mut seen_terminator = false;

    while region_end > 0 {
        let start = region_end.saturating_sub(SCAN_CHUNK_LEN);
        let mut buf = vec![0; (region_end - start) as usize];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut buf).await?;
        region_end = start;

        if !seen_terminator {
            match buf.iter().rposition(|b| *b == b'\n') {
                Some(last) => {
                    buf.truncate(last + 1);
                    seen_terminator = true;
                }
                None => continue,
            }
        }
        buf.extend_from_slice(&carry);
        carry.clear();

        let mut line_end = buf.len();
        while line_end > 0 {
            match buf[..line_end - 1].iter().rposition(|b| *b == b'\n') {
                Some(prev) => {
                    let line = String::from_utf8_lossy(&buf[prev + 1..line_end]);
                    let flow = visit(&line, start + prev as u64 + 1, start + line_end as u64);
                    if flow.is_break() {
                        return Ok(());
                    }
                    line_end = prev + 1;
                }
                None if start == 0 => {
                    let line = String::from_utf8_lossy(&buf[..line_end]);
                    let _ = visit(&line, 0, line_end as u64);
                    line_end = 0;
                }
                None => {
                    carry = buf[..line_end].to_vec();
                    line_end = 0;
                }
            }
        }
    }
    Ok(())
}

/// Brings a server's state up to the end of its log before live tailing.
///
/// A saved position of the same log generation is resumed as is. A first
/// observation, or a log rotated while we were down, goes through the planner.
pub async fn run(
    processor: &LogProcessor,
    state: &mut ServerState,
    path: &Path,
    settings: &CatchupSettings,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let server_id = state.external_id().to_owned();
    let unreadable = |e: io::Error| {
        warn!(server_id = %server_id, "Failed to read log for catch-up: {e}");
        AppError::LogsUnreadable
    };
    let len = tail::file_len(path).await.map_err(unreadable)?;
    let stamp = tail::read_open_stamp(path).await.map_err(unreadable)?;

    if state.has_position() {
        let reopened = matches!(
            (state.server.log_opened_at, stamp),
            (Some(saved), Some(current)) if saved != current
        );
        if len >= state.position() && !reopened {
            info!(
                server_id = state.external_id(),
                position = state.position(),
                "Resuming from saved log position"
            );
            return Ok(());
        }
        info!(
            server_id = state.external_id(),
            reopened, "Log rotated while we were down"
        );
        if state.ongoing.is_some() {
            matches::crash(processor.store(), state, stamp.unwrap_or(now)).await?;
        }
        state.reset_position();
    }

    match plan(path, settings, now).await.map_err(unreadable)? {
        CatchupPlan::Replay { from, marker_at } => {
            info!(
                server_id = state.external_id(),
                from,
                %marker_at,
                "Replaying log from the last map change"
            );
            state.server.log_offset = Some(from);
            state.server.log_opened_at = stamp;
            state.replaying = true;
            let replayed = processor.process_file(state, path).await;
            state.replaying = false;
            let applied = replayed?;
            info!(
                server_id = state.external_id(),
                applied,
                position = state.position(),
                "Catch-up complete"
            );
        }
        CatchupPlan::SkipToEnd { end } => {
            state.server.log_offset = Some(end);
            state.server.log_opened_at = stamp;
            processor.save_position(state).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, SystemTime};

    fn stamp(at: DateTime<Utc>) -> String {
        at.format("[%Y.%m.%d-%H.%M.%S:%3f][  0]").to_string()
    }

    fn write_log(lines: &[String], modified: SystemTime) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file.as_file().set_modified(modified).unwrap();
        file
    }

    fn ago(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        now - TimeDelta::seconds(secs)
    }

    const TRAVEL: &str =
        "LogGameMode: ProcessServerTravel: Farmhouse?Scenario=Scenario_Farmhouse_Push_Insurgents";
    const LOAD: &str =
        "LogLoad: LoadMap: /Game/Maps/Town/Town?Scenario=Scenario_Hideout_Checkpoint_Security";

    #[tokio::test]
    async fn replays_from_recent_travel_of_live_server() {
        let now = Utc::now();
        let lines = vec![
            format!("{}{LOAD}", stamp(ago(now, 900))),
            format!("{}{TRAVEL}", stamp(ago(now, 120))),
            format!("{}LogNet: x", stamp(ago(now, 60))),
            format!("{}LogRcon: 127.0.0.1:5000 << listplayers", stamp(ago(now, 10))),
        ];
        let file = write_log(&lines, (now - TimeDelta::seconds(45)).into());
        let travel_offset = (lines[0].len() + 1) as u64;

        let plan = plan(file.path(), &CatchupSettings::default(), now).await.unwrap();
        let CatchupPlan::Replay { from, .. } = plan else {
            panic!("expected a replay, got {plan:?}");
        };
        assert_eq!(from, travel_offset);
    }

    #[tokio::test]
    async fn falls_back_to_load_without_travel() {
        let now = Utc::now();
        let lines = vec![
            "Log file open, 01/15/24 12:00:00".to_owned(),
            format!("{}{LOAD}", stamp(ago(now, 300))),
            format!("{}LogRcon: 127.0.0.1:5000 << listplayers", stamp(ago(now, 5))),
        ];
        let file = write_log(&lines, now.into());

        let plan = plan(file.path(), &CatchupSettings::default(), now).await.unwrap();
        assert!(matches!(plan, CatchupPlan::Replay { from, .. } if from == (lines[0].len() + 1) as u64));
    }

    #[tokio::test]
    async fn without_liveness_marker_uses_long_threshold() {
        let now = Utc::now();
        let lines = vec![format!("{}{TRAVEL}", stamp(ago(now, 600)))];
        // two minutes old: stale for a live server, fresh enough without a marker
        let file = write_log(&lines, (now - TimeDelta::seconds(120)).into());

        let plan = plan(file.path(), &CatchupSettings::default(), now).await.unwrap();
        assert!(matches!(plan, CatchupPlan::Replay { from: 0, .. }));
    }

    #[tokio::test]
    async fn stale_log_starts_at_end() {
        let now = Utc::now();
        let lines = vec![
            format!("{}{TRAVEL}", stamp(ago(now, 120))),
            format!("{}LogRcon: 127.0.0.1:5000 << listplayers", stamp(ago(now, 10))),
        ];
        let file = write_log(&lines, (now - TimeDelta::seconds(90)).into());
        let len = std::fs::metadata(file.path()).unwrap().len();

        let plan = plan(file.path(), &CatchupSettings::default(), now).await.unwrap();
        assert_eq!(plan, CatchupPlan::SkipToEnd { end: len });
    }

    #[tokio::test]
    async fn old_marker_is_not_an_anchor() {
        let now = Utc::now();
        let lines = vec![
            format!("{}{TRAVEL}", stamp(ago(now, 3 * 3600))),
            format!("{}LogNet: x", stamp(ago(now, 5))),
        ];
        let file = write_log(&lines, now.into());
        let len = std::fs::metadata(file.path()).unwrap().len();

        let plan = plan(file.path(), &CatchupSettings::default(), now).await.unwrap();
        assert_eq!(plan, CatchupPlan::SkipToEnd { end: len });
    }

    #[tokio::test]
    async fn backward_scan_spans_chunks_and_skips_partial_tail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let long_line = "x".repeat(SCAN_CHUNK_LEN as usize + 10);
        write!(file, "first\n{long_line}\nlast\npartial").unwrap();
        file.flush().unwrap();
        let len = std::fs::metadata(file.path()).unwrap().len();

        let mut seen = vec![];
        scan_backward(file.path(), len, |line, start, end| {
            seen.push((line.trim_end().len(), start, end));
            ControlFlow::Continue(())
        })
        .await
        .unwrap();

        let long_start = 6u64;
        let long_end = long_start + long_line.len() as u64 + 1;
        assert_eq!(
            seen,
            vec![
                (4, long_end, long_end + 5),
                (long_line.len(), long_start, long_end),
                (5, 0, 6),
            ]
        );
    }

    #[test]
    fn std_duration_converts() {
        assert_eq!(delta(Duration::from_secs(30)), TimeDelta::seconds(30));
    }
}
