//! Audit sink implementations.
//!
//! Provides in-memory logging and Postgres schema definitions for the booking audit trail.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::util::clock::now_ms;
use crate::util::serde::{SlotId, UserId};

/// Booking transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A reservation was accepted.
    Reserve,
    /// A reservation was cancelled by its owner.
    Cancel,
    /// A just-inserted reservation was removed after the capacity check failed.
    Rollback,
    /// The active day moved forward.
    Rollover,
}

impl AuditAction {
    /// Lowercase name used in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reserve => "reserve",
            Self::Cancel => "cancel",
            Self::Rollback => "rollback",
            Self::Rollover => "rollover",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Action taken.
    pub action: AuditAction,
    /// Active date (`YYYY-MM-DD`) the action applies to.
    pub active_date: String,
    /// Slot involved, if any.
    pub slot_id: Option<SlotId>,
    /// Acting user, if any.
    pub user_id: Option<UserId>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub payload: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Shared handle under which the booking core holds its sink.
pub type SharedAuditSink = Arc<Mutex<Box<dyn AuditSink>>>;

/// Wrap a sink for sharing.
pub fn shared_sink(sink: impl AuditSink + 'static) -> SharedAuditSink {
    Arc::new(Mutex::new(Box::new(sink)))
}

/// In-memory audit sink for testing and dev. Clones share one buffer.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Postgres schema for the audit log.
pub struct PostgresAuditSink;

impl PostgresAuditSink {
    /// Returns SQL migration statements for the audit log.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS booking_audit_events (
    event_id TEXT PRIMARY KEY,
    action TEXT NOT NULL,
    active_date TEXT NOT NULL,
    slot_id UUID,
    user_id UUID,
    payload JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)",
            "CREATE INDEX IF NOT EXISTS idx_booking_audit_events_date ON booking_audit_events (active_date, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_booking_audit_events_user ON booking_audit_events (user_id)",
        ]
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    action: AuditAction,
    active_date: impl Into<String>,
    slot_id: Option<SlotId>,
    user_id: Option<UserId>,
    payload: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        action,
        active_date: active_date.into(),
        slot_id,
        user_id,
        created_at_ms: now_ms(),
        payload,
    }
}
