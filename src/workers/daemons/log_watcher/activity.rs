use crate::common::context::Context;
use crate::repositories::activity::{self, ActivityMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityChange {
    Activated,
    Deactivated,
}

impl ActivityChange {
    pub const fn is_active(&self) -> bool {
        matches!(self, ActivityChange::Activated)
    }
}

/// Edge-triggered activity of one server's log: each edge is reported once.
#[derive(Debug)]
pub struct ActivityTracker {
    quiet_period: Duration,
    last_activity: Option<Instant>,
    active: bool,
}

impl ActivityTracker {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            last_activity: None,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn record_activity(&mut self, now: Instant) -> Option<ActivityChange> {
        self.last_activity = Some(now);
        if self.active {
            return None;
        }
        self.active = true;
        Some(ActivityChange::Activated)
    }

    pub fn check_idle(&mut self, now: Instant) -> Option<ActivityChange> {
        let quiet = self
            .last_activity
            .is_none_or(|last| now.duration_since(last) >= self.quiet_period);
        if !self.active || !quiet {
            return None;
        }
        self.active = false;
        Some(ActivityChange::Deactivated)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityEvent<'a> {
    pub server_id: i64,
    pub external_id: &'a str,
    pub change: ActivityChange,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait ActivityListener: Send + Sync {
    async fn on_activity(&self, event: &ActivityEvent<'_>);
}

/// Publishes activity edges on redis for the API layer.
pub struct ActivityPublisher<C> {
    ctx: C,
}

impl<C: Context> ActivityPublisher<C> {
    pub fn new(ctx: C) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<C: Context> ActivityListener for ActivityPublisher<C> {
    async fn on_activity(&self, event: &ActivityEvent<'_>) {
        let message = ActivityMessage {
            server_id: event.external_id,
            active: event.change.is_active(),
            at: event.at,
        };
        if let Err(e) = activity::publish(&self.ctx, &message).await {
            warn!(server_id = event.external_id, "Failed to publish server activity: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_edge_once() {
        let start = Instant::now();
        let mut tracker = ActivityTracker::new(Duration::from_secs(10));
        assert_eq!(tracker.check_idle(start), None);

        assert_eq!(tracker.record_activity(start), Some(ActivityChange::Activated));
        assert_eq!(tracker.record_activity(start + Duration::from_secs(1)), None);
        assert_eq!(tracker.check_idle(start + Duration::from_secs(5)), None);

        let quiet = start + Duration::from_secs(11);
        assert_eq!(tracker.check_idle(quiet), Some(ActivityChange::Deactivated));
        assert_eq!(tracker.check_idle(quiet + Duration::from_secs(10)), None);
        assert!(!tracker.is_active());

        assert_eq!(
            tracker.record_activity(quiet + Duration::from_secs(20)),
            Some(ActivityChange::Activated)
        );
    }
}
