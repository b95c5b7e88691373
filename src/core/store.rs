//! Booking store abstraction: persisted reservations keyed by (day, slot, user).
//!
//! Backends must enforce two things themselves rather than leaving them to
//! callers: uniqueness of the (day, slot, user) triple, reported as
//! [`ConflictKind::AlreadyReserved`](crate::core::ConflictKind), and expiry, so
//! that a row whose `expires_at` has passed is never returned again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::BookingResult;
use crate::util::serde::{ReservationId, SlotId, UserId};

/// A persisted reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Row identifier.
    pub id: ReservationId,
    /// Store-assigned insertion sequence, strictly increasing.
    pub seq: i64,
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Reserving user.
    pub user_id: UserId,
    /// Midnight of the active day the reservation belongs to.
    pub day: DateTime<Utc>,
    /// Cutoff moment of that day; the row disappears afterwards.
    pub expires_at: DateTime<Utc>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Insert request for a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Reserving user.
    pub user_id: UserId,
    /// Midnight of the active day.
    pub day: DateTime<Utc>,
    /// Cutoff moment of the active day.
    pub expires_at: DateTime<Utc>,
}

/// Persistence for reservations. Only the reservation protocol mutates it.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a reservation, assigning `id` and `seq`.
    async fn insert(&self, new: NewReservation) -> BookingResult<Reservation>;

    /// Find the live reservation for a (day, slot, user) triple.
    async fn find(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<Option<Reservation>>;

    /// Delete by row id. Returns whether a row was removed.
    async fn delete(&self, id: ReservationId) -> BookingResult<bool>;

    /// Delete the live reservation for a (day, slot, user) triple.
    async fn delete_matching(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<bool>;

    /// Live reservations for `day` among `slot_ids`, ordered by `seq`.
    async fn list(&self, day: DateTime<Utc>, slot_ids: &[SlotId]) -> BookingResult<Vec<Reservation>>;
}
