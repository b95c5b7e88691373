//! The assembled booking core shared by the HTTP and websocket surfaces.

use std::time::Duration;

use crate::core::audit::SharedAuditSink;
use crate::core::broadcast::BroadcastHub;
use crate::core::identity::SessionIdentity;
use crate::core::occupancy::{ActiveSchedule, CapacityAccounting};
use crate::core::protocol::ReservationProtocol;
use crate::core::rollover::RolloverMonitor;
use crate::core::BookingResult;

/// Cheaply cloneable handle to every booking component.
#[derive(Clone)]
pub struct BookingService {
    protocol: ReservationProtocol,
    audit: Option<SharedAuditSink>,
}

impl BookingService {
    /// Wire the protocol over `accounting`, publishing to `hub`.
    pub fn new(accounting: CapacityAccounting, hub: BroadcastHub) -> Self {
        Self {
            protocol: ReservationProtocol::new(accounting, hub),
            audit: None,
        }
    }

    /// Record transitions to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.protocol = self.protocol.with_audit(audit.clone());
        self.audit = Some(audit);
        self
    }

    /// Reserve/cancel protocol.
    pub const fn protocol(&self) -> &ReservationProtocol {
        &self.protocol
    }

    /// Occupancy and schedule queries.
    pub const fn accounting(&self) -> &CapacityAccounting {
        self.protocol.accounting()
    }

    /// Broadcast hub.
    pub const fn hub(&self) -> &BroadcastHub {
        self.protocol.hub()
    }

    /// Active-day schedule for `viewer`.
    pub async fn active_schedule(&self, viewer: &SessionIdentity) -> BookingResult<ActiveSchedule> {
        self.accounting().active_schedule(viewer).await
    }

    /// A rollover monitor sharing this service's resolver, hub and audit sink.
    pub fn rollover_monitor(&self, poll: Duration, grace: chrono::Duration) -> RolloverMonitor {
        let monitor = RolloverMonitor::new(
            self.accounting().resolver().clone(),
            self.hub().clone(),
            poll,
            grace,
        );
        match &self.audit {
            Some(audit) => monitor.with_audit(audit.clone()),
            None => monitor,
        }
    }
}
