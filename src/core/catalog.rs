//! Schedule catalog: recurring weekday time slots with per-gender capacity.

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::core::calendar::WeekdayName;
use crate::core::gender::GenderBucket;
use crate::core::{BookingError, BookingResult};
use crate::util::serde::SlotId;

/// A recurring class window. Owned by the admin workflow; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Stable identifier.
    pub id: SlotId,
    /// Weekday the slot recurs on.
    pub weekday: WeekdayName,
    /// Start time of day.
    pub start: NaiveTime,
    /// End time of day, strictly after `start`.
    pub end: NaiveTime,
    /// Seats for bucket A.
    pub capacity_male: u32,
    /// Seats for bucket B.
    pub capacity_female: u32,
}

impl TimeSlot {
    /// Build a slot, rejecting windows where `start >= end`.
    pub fn new(
        id: SlotId,
        weekday: WeekdayName,
        start: NaiveTime,
        end: NaiveTime,
        capacity_male: u32,
        capacity_female: u32,
    ) -> BookingResult<Self> {
        if start >= end {
            return Err(BookingError::validation(format!(
                "slot {id} starts at {start} but ends at {end}"
            )));
        }
        Ok(Self {
            id,
            weekday,
            start,
            end,
            capacity_male,
            capacity_female,
        })
    }

    /// Capacity charged against a bucket.
    pub const fn capacity_for(&self, bucket: GenderBucket) -> u32 {
        match bucket {
            GenderBucket::Male => self.capacity_male,
            GenderBucket::Female => self.capacity_female,
        }
    }
}

/// Stable sort by start time; slots starting together keep their input order.
pub fn sort_by_start(slots: &mut [TimeSlot]) {
    slots.sort_by_key(|slot| slot.start);
}

/// Read access to slot definitions.
#[async_trait]
pub trait ScheduleCatalog: Send + Sync {
    /// Slots recurring on `weekday`, ordered by start time.
    async fn slots_for_weekday(&self, weekday: WeekdayName) -> BookingResult<Vec<TimeSlot>>;

    /// Look up a single slot.
    async fn find_slot(&self, id: SlotId) -> BookingResult<Option<TimeSlot>>;
}
