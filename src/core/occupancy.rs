//! Capacity accounting: per-slot, per-bucket occupancy for the active day.
//!
//! Occupancy is always derived from the store; nothing here caches counts.
//! Reservations are joined to the [`UserDirectory`] for their bucket. Users the
//! directory cannot classify still show up in the slot's user set but are
//! charged against neither bucket.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::calendar::{ActiveDay, ActiveDayResolver, WeekdayName};
use crate::core::catalog::{ScheduleCatalog, TimeSlot};
use crate::core::directory::UserDirectory;
use crate::core::gender::GenderBucket;
use crate::core::identity::SessionIdentity;
use crate::core::store::{BookingStore, Reservation};
use crate::core::BookingResult;
use crate::util::serde::{SlotId, UserId};

/// Gender lookup result keyed by user.
pub type GenderMap = HashMap<UserId, Option<GenderBucket>>;

/// Live counts for one slot on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotOccupancy {
    /// Reservations charged to bucket A.
    pub male: u32,
    /// Reservations charged to bucket B.
    pub female: u32,
    /// Every user holding a reservation, classified or not.
    pub users: HashSet<UserId>,
}

impl SlotOccupancy {
    /// Count for a bucket.
    pub const fn occupied(&self, bucket: GenderBucket) -> u32 {
        match bucket {
            GenderBucket::Male => self.male,
            GenderBucket::Female => self.female,
        }
    }

    /// Seats left in a bucket; never negative.
    pub fn free(&self, slot: &TimeSlot, bucket: GenderBucket) -> u32 {
        slot.capacity_for(bucket).saturating_sub(self.occupied(bucket))
    }

    fn charge(&mut self, user: UserId, bucket: Option<GenderBucket>) {
        match bucket {
            Some(GenderBucket::Male) => self.male += 1,
            Some(GenderBucket::Female) => self.female += 1,
            None => {}
        }
        self.users.insert(user);
    }
}

/// Aggregate reservations into per-slot occupancy.
///
/// Every id in `slot_ids` gets an entry, zeroed when nobody booked it. Rows for
/// other slots are ignored.
pub fn tally(
    rows: &[Reservation],
    genders: &GenderMap,
    slot_ids: &[SlotId],
) -> HashMap<SlotId, SlotOccupancy> {
    let mut out: HashMap<SlotId, SlotOccupancy> = slot_ids
        .iter()
        .map(|id| (*id, SlotOccupancy::default()))
        .collect();
    for row in rows {
        if let Some(slot) = out.get_mut(&row.slot_id) {
            slot.charge(row.user_id, genders.get(&row.user_id).copied().flatten());
        }
    }
    out
}

/// Rows and bucket assignments of one slot, read together.
#[derive(Debug, Clone)]
pub struct SlotLedger {
    /// Slot the ledger describes.
    pub slot_id: SlotId,
    /// Live reservations for the slot, in `seq` order.
    pub rows: Vec<Reservation>,
    /// Bucket per reserving user.
    pub genders: GenderMap,
}

impl SlotLedger {
    /// Occupancy at the moment the ledger was read.
    pub fn occupancy(&self) -> SlotOccupancy {
        tally(&self.rows, &self.genders, &[self.slot_id])
            .remove(&self.slot_id)
            .unwrap_or_default()
    }

    /// Position of `reservation` among the rows charged to `bucket`, counting from 1.
    ///
    /// Rows ahead are charged by their directory bucket, the same source
    /// [`SlotLedger::occupancy`] counts from. Returns `None` when the row is no
    /// longer present.
    pub fn rank_of(&self, reservation: &Reservation, bucket: GenderBucket) -> Option<u32> {
        if !self.rows.iter().any(|row| row.id == reservation.id) {
            return None;
        }
        let ahead = self
            .rows
            .iter()
            .filter(|row| row.seq < reservation.seq)
            .filter(|row| self.genders.get(&row.user_id).copied().flatten() == Some(bucket))
            .count();
        Some(u32::try_from(ahead).unwrap_or(u32::MAX).saturating_add(1))
    }
}

/// Client view of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Slot identifier.
    pub slot_id: SlotId,
    /// Weekday the slot recurs on.
    pub weekday: WeekdayName,
    /// Start, `HH:MM`.
    pub start: String,
    /// End, `HH:MM`.
    pub end: String,
    /// Bucket A capacity.
    pub capacity_a: u32,
    /// Bucket B capacity.
    pub capacity_b: u32,
    /// Bucket A reservations.
    pub occupied_a: u32,
    /// Bucket B reservations.
    pub occupied_b: u32,
    /// Bucket A seats left.
    pub free_a: u32,
    /// Bucket B seats left.
    pub free_b: u32,
    /// Whether the requesting user holds a reservation here.
    pub viewer_has_reservation: bool,
}

impl SlotView {
    /// Combine a slot definition with its occupancy.
    pub fn new(slot: &TimeSlot, occupancy: &SlotOccupancy, viewer: UserId) -> Self {
        Self {
            slot_id: slot.id,
            weekday: slot.weekday,
            start: slot.start.format("%H:%M").to_string(),
            end: slot.end.format("%H:%M").to_string(),
            capacity_a: slot.capacity_male,
            capacity_b: slot.capacity_female,
            occupied_a: occupancy.male,
            occupied_b: occupancy.female,
            free_a: occupancy.free(slot, GenderBucket::Male),
            free_b: occupancy.free(slot, GenderBucket::Female),
            viewer_has_reservation: occupancy.users.contains(&viewer),
        }
    }
}

/// Response of the active-schedule query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSchedule {
    /// Active date, `YYYY-MM-DD`.
    pub active_date: String,
    /// Weekday of the active date.
    pub weekday: WeekdayName,
    /// Cutoff in force, `HH:MM`.
    pub cutoff: String,
    /// Requesting user's bucket, if classifiable.
    pub viewer_gender: Option<GenderBucket>,
    /// Slots of the active weekday ordered by start.
    pub slots: Vec<SlotView>,
}

/// Joins the catalog, the store and the user directory.
#[derive(Clone)]
pub struct CapacityAccounting {
    resolver: ActiveDayResolver,
    catalog: Arc<dyn ScheduleCatalog>,
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn UserDirectory>,
}

impl CapacityAccounting {
    /// Create an accounting view over the given collaborators.
    pub fn new(
        resolver: ActiveDayResolver,
        catalog: Arc<dyn ScheduleCatalog>,
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            resolver,
            catalog,
            store,
            directory,
        }
    }

    /// Active-day resolver.
    pub const fn resolver(&self) -> &ActiveDayResolver {
        &self.resolver
    }

    /// Slot definitions.
    pub fn catalog(&self) -> &Arc<dyn ScheduleCatalog> {
        &self.catalog
    }

    /// Reservation store.
    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    async fn genders_for(&self, rows: &[Reservation]) -> BookingResult<GenderMap> {
        let mut users: Vec<UserId> = rows.iter().map(|row| row.user_id).collect();
        users.sort_unstable();
        users.dedup();
        self.directory.genders_of(&users).await
    }

    /// Bucket the directory charges `user` to.
    pub async fn bucket_of(&self, user: UserId) -> BookingResult<Option<GenderBucket>> {
        let genders = self.directory.genders_of(&[user]).await?;
        Ok(genders.get(&user).copied().flatten())
    }

    /// Occupancy of `slot_ids` on the day starting at `day`.
    pub async fn occupancy(
        &self,
        day: DateTime<Utc>,
        slot_ids: &[SlotId],
    ) -> BookingResult<HashMap<SlotId, SlotOccupancy>> {
        let rows = self.store.list(day, slot_ids).await?;
        let genders = self.genders_for(&rows).await?;
        Ok(tally(&rows, &genders, slot_ids))
    }

    /// Rows and buckets of a single slot.
    pub async fn ledger(&self, day: DateTime<Utc>, slot_id: SlotId) -> BookingResult<SlotLedger> {
        let rows = self.store.list(day, &[slot_id]).await?;
        let genders = self.genders_for(&rows).await?;
        Ok(SlotLedger {
            slot_id,
            rows,
            genders,
        })
    }

    /// Active-day schedule as seen by `viewer`.
    pub async fn active_schedule(&self, viewer: &SessionIdentity) -> BookingResult<ActiveSchedule> {
        let day = self.resolver.resolve().await;
        self.schedule_for(&day, viewer).await
    }

    /// Schedule for an already resolved day.
    pub async fn schedule_for(
        &self,
        day: &ActiveDay,
        viewer: &SessionIdentity,
    ) -> BookingResult<ActiveSchedule> {
        let slots = self.catalog.slots_for_weekday(day.weekday).await?;
        let ids: Vec<SlotId> = slots.iter().map(|slot| slot.id).collect();
        let occupancy = self.occupancy(day.midnight, &ids).await?;

        let empty = SlotOccupancy::default();
        let views = slots
            .iter()
            .map(|slot| SlotView::new(slot, occupancy.get(&slot.id).unwrap_or(&empty), viewer.user_id))
            .collect();

        Ok(ActiveSchedule {
            active_date: day.date_key(),
            weekday: day.weekday,
            cutoff: day.cutoff.to_string(),
            viewer_gender: viewer.gender,
            slots: views,
        })
    }
}
