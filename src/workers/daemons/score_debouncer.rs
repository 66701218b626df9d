//! Coalesces score-affecting events of one server into few RCON reconciliations.
//!
//! Each trigger restarts a quiet timer; a burst that never goes quiet still fires
//! once `max_wait` has passed since its first trigger. The action runs on its own
//! task, off the log worker. A burst that comes due while the previous action is
//! still running fires as soon as that one finishes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct DebounceWindow {
    pub quiet: Duration,
    pub max_wait: Duration,
}

/// Cheap handle the log worker pokes after a score-affecting event.
#[derive(Debug, Clone)]
pub struct ScoreTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ScoreTrigger {
    pub fn trigger(&self) {
        // closed only during shutdown
        let _ = self.tx.send(());
    }
}

/// Spawns the debouncer. It stops once every [`ScoreTrigger`] is dropped, without
/// firing a pending burst.
pub fn spawn<F, Fut>(window: DebounceWindow, fire: F) -> (ScoreTrigger, JoinHandle<()>)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(window, rx, fire));
    (ScoreTrigger { tx }, handle)
}

async fn run<F, Fut>(window: DebounceWindow, mut rx: mpsc::UnboundedReceiver<()>, fire: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight: Option<JoinHandle<()>> = None;
    while rx.recv().await.is_some() {
        let deadline = Instant::now() + window.max_wait;
        let mut fire_at = (Instant::now() + window.quiet).min(deadline);
        let mut triggers = 1usize;

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(()) => {
                        triggers += 1;
                        fire_at = (Instant::now() + window.quiet).min(deadline);
                    }
                    None => return,
                },
                _ = sleep_until(fire_at) => break,
            }
        }

        if let Some(previous) = in_flight.take() {
            if !previous.is_finished() {
                debug!(triggers, "Previous score poll still running, firing after it");
            }
            if let Err(e) = previous.await {
                warn!("Score poll task failed: {e}");
            }
            // triggers queued meanwhile are covered by the poll about to start
            while rx.try_recv().is_ok() {
                triggers += 1;
            }
        }
        debug!(triggers, "Firing score poll");
        in_flight = Some(tokio::spawn(fire()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const WINDOW: DebounceWindow = DebounceWindow {
        quiet: Duration::from_secs(10),
        max_wait: Duration::from_secs(25),
    };

    fn recording_debouncer() -> (ScoreTrigger, Arc<Mutex<Vec<Instant>>>) {
        let fired = Arc::new(Mutex::new(vec![]));
        let recorded = fired.clone();
        let (trigger, _handle) = spawn(WINDOW, move || {
            let recorded = recorded.clone();
            async move { recorded.lock().unwrap().push(Instant::now()) }
        });
        (trigger, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once() {
        let (trigger, fired) = recording_debouncer();
        let start = Instant::now();
        for _ in 0..5 {
            trigger.trigger();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tokio::time::sleep(Duration::from_secs(60)).await;

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert!(fired[0] - start <= Duration::from_secs(25));
        assert!(fired[0] - start >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn steady_triggers_fire_at_max_wait() {
        let (trigger, fired) = recording_debouncer();
        let start = Instant::now();
        for _ in 0..8 {
            trigger.trigger();
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert!(fired[0] - start <= Duration::from_secs(25));
        assert!(fired[0] - start >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let (trigger, fired) = recording_debouncer();
        trigger.trigger();
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.trigger();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(fired.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_due_during_slow_poll_fires_after_it() {
        let fired = Arc::new(Mutex::new(vec![]));
        let recorded = fired.clone();
        let (trigger, _handle) = spawn(WINDOW, move || {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(Instant::now());
                tokio::time::sleep(Duration::from_secs(28)).await;
            }
        });
        let start = Instant::now();
        trigger.trigger();
        tokio::time::sleep(Duration::from_secs(15)).await;
        trigger.trigger();
        tokio::time::sleep(Duration::from_secs(120)).await;

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 2);
        assert!(fired[0] - start >= Duration::from_secs(10));
        assert!(fired[0] - start < Duration::from_secs(11));
        // the second burst came due at 25s and waited for the first poll to end at 38s
        assert!(fired[1] - start >= Duration::from_secs(38));
        assert!(fired[1] - start < Duration::from_secs(39));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_without_firing_when_dropped() {
        let (trigger, fired) = recording_debouncer();
        trigger.trigger();
        drop(trigger);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(fired.lock().unwrap().is_empty());
    }
}
