//! Reservation protocol: reserve and cancel for the active day.
//!
//! Per (user, active day, slot) a user is either unbooked or booked. Reserve
//! inserts first and verifies afterwards. The new row stands only when its
//! rank among same-bucket rows of the slot, ordered by store sequence, is
//! within capacity; otherwise the row is deleted again. Concurrent reservers
//! therefore resolve in insertion order and the slot is never left over
//! capacity by an accepted reservation.

use serde::{Deserialize, Serialize};

use crate::core::audit::{build_audit_event, AuditAction, SharedAuditSink};
use crate::core::broadcast::{BroadcastHub, ServerEvent};
use crate::core::calendar::ActiveDay;
use crate::core::catalog::TimeSlot;
use crate::core::gender::GenderBucket;
use crate::core::identity::SessionIdentity;
use crate::core::occupancy::{CapacityAccounting, SlotOccupancy};
use crate::core::store::{NewReservation, Reservation};
use crate::core::{BookingError, BookingResult, ConflictKind};
use crate::util::serde::{SlotId, UserId};

/// Reply to exactly one protocol call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the transition happened.
    pub ok: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl Ack {
    /// Successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// Failed outcome.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl From<BookingResult<Transition>> for Ack {
    fn from(result: BookingResult<Transition>) -> Self {
        match result {
            Ok(transition) => transition.into(),
            Err(BookingError::Backend(_)) => Self::rejected("booking service unavailable"),
            Err(err) => Self::rejected(err.to_string()),
        }
    }
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A seat was taken.
    Reserved(Reservation),
    /// A seat was released.
    Cancelled,
}

impl From<Transition> for Ack {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Reserved(_) => Self::ok("reserved"),
            Transition::Cancelled => Self::ok("cancelled"),
        }
    }
}

/// Parse a client-supplied slot id: missing is a validation error, unparsable an unknown slot.
pub fn parse_slot_id(raw: Option<&str>) -> BookingResult<SlotId> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BookingError::validation("slotId is required"))?;
    raw.parse()
        .map_err(|_| BookingError::not_found(format!("slot {raw} not found")))
}

/// Executes reserve and cancel against the store and announces accepted transitions.
#[derive(Clone)]
pub struct ReservationProtocol {
    accounting: CapacityAccounting,
    hub: BroadcastHub,
    audit: Option<SharedAuditSink>,
}

impl ReservationProtocol {
    /// Create a protocol over the accounting view and broadcast hub.
    pub const fn new(accounting: CapacityAccounting, hub: BroadcastHub) -> Self {
        Self {
            accounting,
            hub,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Capacity accounting the protocol verifies against.
    pub const fn accounting(&self) -> &CapacityAccounting {
        &self.accounting
    }

    /// Hub that receives occupancy updates.
    pub const fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Reserve `raw_slot` for the active day and reply with an ack.
    pub async fn reserve(&self, identity: &SessionIdentity, raw_slot: Option<&str>) -> Ack {
        let result = self.try_reserve(identity, raw_slot).await;
        if let Err(err) = &result {
            Self::log_rejection("reserve", identity.user_id, err);
        }
        result.into()
    }

    /// Cancel the caller's reservation of `raw_slot` and reply with an ack.
    pub async fn cancel(&self, identity: &SessionIdentity, raw_slot: Option<&str>) -> Ack {
        let result = self.try_cancel(identity, raw_slot).await;
        if let Err(err) = &result {
            Self::log_rejection("cancel", identity.user_id, err);
        }
        result.into()
    }

    /// Reserve, reporting the typed error on failure.
    pub async fn try_reserve(
        &self,
        identity: &SessionIdentity,
        raw_slot: Option<&str>,
    ) -> BookingResult<Transition> {
        let slot_id = parse_slot_id(raw_slot)?;
        let bucket = self.charged_bucket(identity).await?;
        let day = self.accounting.resolver().resolve().await;
        let slot = self.find_slot(slot_id).await?;

        let store = self.accounting.store();
        if store
            .find(day.midnight, slot_id, identity.user_id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::AlreadyReserved.into());
        }
        if day.closes_at <= self.accounting.resolver().now() {
            return Err(ConflictKind::DayClosed.into());
        }

        let inserted = store
            .insert(NewReservation {
                slot_id,
                user_id: identity.user_id,
                day: day.midnight,
                expires_at: day.closes_at,
            })
            .await?;

        let ledger = self.accounting.ledger(day.midnight, slot_id).await?;
        let capacity = slot.capacity_for(bucket);
        let Some(rank) = ledger.rank_of(&inserted, bucket) else {
            // Past the cutoff by the store's clock.
            store.delete(inserted.id).await?;
            tracing::info!(
                user = %identity.user_id,
                slot = %slot_id,
                closes_at = %day.closes_at,
                "reservation expired before verification; rolled back"
            );
            self.record(AuditAction::Rollback, &day, slot_id, identity.user_id);
            return Err(ConflictKind::DayClosed.into());
        };
        if rank > capacity {
            store.delete(inserted.id).await?;
            tracing::info!(
                user = %identity.user_id,
                slot = %slot_id,
                rank,
                capacity,
                "over capacity after insert; rolled back"
            );
            self.record(AuditAction::Rollback, &day, slot_id, identity.user_id);
            return Err(ConflictKind::CapacityExhausted.into());
        }

        tracing::info!(
            user = %identity.user_id,
            slot = %slot_id,
            date = %day.date,
            bucket = bucket.code(),
            "reservation accepted"
        );
        self.record(AuditAction::Reserve, &day, slot_id, identity.user_id);
        self.announce(&day, &slot, &ledger.occupancy());
        Ok(Transition::Reserved(inserted))
    }

    /// Cancel, reporting the typed error on failure.
    pub async fn try_cancel(
        &self,
        identity: &SessionIdentity,
        raw_slot: Option<&str>,
    ) -> BookingResult<Transition> {
        let slot_id = parse_slot_id(raw_slot)?;
        let day = self.accounting.resolver().resolve().await;

        let removed = self
            .accounting
            .store()
            .delete_matching(day.midnight, slot_id, identity.user_id)
            .await?;
        if !removed {
            return Err(ConflictKind::NotReserved.into());
        }

        tracing::info!(user = %identity.user_id, slot = %slot_id, date = %day.date, "reservation cancelled");
        self.record(AuditAction::Cancel, &day, slot_id, identity.user_id);

        match self.accounting.catalog().find_slot(slot_id).await? {
            Some(slot) => {
                let occupancy = self.accounting.ledger(day.midnight, slot_id).await?.occupancy();
                self.announce(&day, &slot, &occupancy);
            }
            None => tracing::warn!(slot = %slot_id, "cancelled a reservation for a slot no longer in the catalog"),
        }

        Ok(Transition::Cancelled)
    }

    /// The session's bucket, provided the user directory charges the user the same way.
    async fn charged_bucket(&self, identity: &SessionIdentity) -> BookingResult<GenderBucket> {
        let session = identity.gender.ok_or(BookingError::UnclassifiedGender)?;
        let directory = self.accounting.bucket_of(identity.user_id).await?;
        if directory != Some(session) {
            tracing::warn!(
                user = %identity.user_id,
                session = session.code(),
                directory = directory.map(GenderBucket::code),
                "session gender disagrees with the user directory"
            );
            return Err(BookingError::UnclassifiedGender);
        }
        Ok(session)
    }

    async fn find_slot(&self, slot_id: SlotId) -> BookingResult<TimeSlot> {
        self.accounting
            .catalog()
            .find_slot(slot_id)
            .await?
            .ok_or_else(|| BookingError::not_found(format!("slot {slot_id} not found")))
    }

    fn announce(&self, day: &ActiveDay, slot: &TimeSlot, occupancy: &SlotOccupancy) {
        let active_date = day.date_key();
        let event = ServerEvent::OccupancyChanged {
            active_date: active_date.clone(),
            slot_id: slot.id,
            free_a: occupancy.free(slot, GenderBucket::Male),
            free_b: occupancy.free(slot, GenderBucket::Female),
        };
        let delivered = self.hub.publish_to_room(&active_date, &event);
        tracing::debug!(room = %active_date, delivered, "occupancy broadcast");
    }

    fn record(&self, action: AuditAction, day: &ActiveDay, slot_id: SlotId, user_id: UserId) {
        if let Some(sink) = self.audit.as_ref() {
            sink.lock().record(build_audit_event(
                action,
                day.date_key(),
                Some(slot_id),
                Some(user_id),
                None,
            ));
        }
    }

    fn log_rejection(op: &str, user: UserId, err: &BookingError) {
        match err {
            BookingError::Backend(_) => tracing::error!(op, %user, error = %err, "booking call failed"),
            _ => tracing::warn!(op, %user, code = err.code(), "booking call rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_parsing_distinguishes_missing_from_unknown() {
        assert!(matches!(parse_slot_id(None), Err(BookingError::Validation(_))));
        assert!(matches!(parse_slot_id(Some("  ")), Err(BookingError::Validation(_))));
        assert!(matches!(parse_slot_id(Some("nope")), Err(BookingError::NotFound(_))));
        let id = SlotId::new();
        assert_eq!(parse_slot_id(Some(&id.to_string())), Ok(id));
    }

    #[test]
    fn acks_carry_conflict_messages_and_hide_backend_detail() {
        let ack: Ack = BookingResult::<Transition>::Err(ConflictKind::CapacityExhausted.into()).into();
        assert_eq!(ack, Ack::rejected("capacity exhausted by concurrency"));

        let ack: Ack = BookingResult::<Transition>::Err(BookingError::backend("pool timed out")).into();
        assert!(!ack.ok);
        assert!(!ack.message.contains("pool"));
    }
}
