//! Active-day rollover detection and the background task that announces it.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::core::audit::{build_audit_event, AuditAction, SharedAuditSink};
use crate::core::broadcast::{BroadcastHub, ServerEvent};
use crate::core::calendar::{cutoff_moment, ActiveDay, ActiveDayResolver};

/// Abstraction over async spawn (Tokio, tests, or custom executors).
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// What the monitor has seen so far. Owned by one monitor; never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverState {
    /// Active date resolved on the previous tick.
    pub last_observed_date: Option<NaiveDate>,
    /// `"{date}|{HH:MM}"` of the last announced transition.
    pub last_fired_key: Option<String>,
}

impl RolloverState {
    /// Feed one resolution. Returns the event to announce, if this is a fresh transition.
    ///
    /// A transition fires when the active date moves past the last observed one
    /// and `now` lies within `grace` after the previous date's cutoff moment.
    /// The first observation only seeds the state.
    pub fn observe(
        &mut self,
        day: &ActiveDay,
        now: DateTime<Utc>,
        tz: Tz,
        grace: chrono::Duration,
    ) -> Option<ServerEvent> {
        let previous = self.last_observed_date.replace(day.date)?;
        if day.date <= previous {
            return None;
        }

        let boundary = cutoff_moment(previous, tz, day.cutoff);
        let elapsed = now.signed_duration_since(boundary);
        if elapsed < chrono::Duration::zero() || elapsed > grace {
            tracing::debug!(%previous, date = %day.date, "active day advanced outside the rollover window");
            return None;
        }

        let key = format!("{}|{}", previous.format("%Y-%m-%d"), day.cutoff);
        if self.last_fired_key.as_deref() == Some(key.as_str()) {
            return None;
        }
        self.last_fired_key = Some(key);
        Some(ServerEvent::DayRolledOver {
            new_active_date: day.date_key(),
        })
    }
}

/// Polls the resolver and tells every connected session when the active day changes.
#[derive(Clone)]
pub struct RolloverMonitor {
    resolver: ActiveDayResolver,
    hub: BroadcastHub,
    poll: Duration,
    grace: chrono::Duration,
    audit: Option<SharedAuditSink>,
}

impl RolloverMonitor {
    /// Create a monitor polling every `poll` and firing within `grace` of the cutoff.
    pub const fn new(
        resolver: ActiveDayResolver,
        hub: BroadcastHub,
        poll: Duration,
        grace: chrono::Duration,
    ) -> Self {
        Self {
            resolver,
            hub,
            poll,
            grace,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// One poll: resolve, compare with `state`, broadcast if a transition fired.
    pub async fn tick(&self, state: &mut RolloverState) -> Option<ServerEvent> {
        let day = self.resolver.resolve().await;
        let event = state.observe(&day, self.resolver.now(), self.resolver.timezone(), self.grace)?;

        let delivered = self.hub.publish_all(&event);
        tracing::info!(date = %day.date, delivered, "active day rolled over");
        if let Some(sink) = self.audit.as_ref() {
            sink.lock()
                .record(build_audit_event(AuditAction::Rollover, day.date_key(), None, None, None));
        }
        Some(event)
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut state = RolloverState::default();
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(&mut state).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("rollover monitor stopped");
    }

    /// Run the monitor on `spawner`.
    pub fn spawn_on<S: Spawn>(self, spawner: &S, shutdown: watch::Receiver<bool>) {
        tracing::info!(poll_secs = self.poll.as_secs(), "starting rollover monitor");
        spawner.spawn(self.run(shutdown));
    }
}
