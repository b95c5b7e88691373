//! In-memory schedule catalog.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::calendar::WeekdayName;
use crate::core::catalog::{sort_by_start, ScheduleCatalog, TimeSlot};
use crate::core::BookingResult;
use crate::util::serde::SlotId;

/// Slot definitions kept in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    slots: Arc<RwLock<Vec<TimeSlot>>>,
}

impl InMemoryCatalog {
    /// Catalog seeded with `slots`.
    pub fn with_slots(slots: impl IntoIterator<Item = TimeSlot>) -> Self {
        Self {
            slots: Arc::new(RwLock::new(slots.into_iter().collect())),
        }
    }

    /// Add or replace a slot by id.
    pub fn upsert(&self, slot: TimeSlot) {
        let mut slots = self.slots.write();
        match slots.iter_mut().find(|s| s.id == slot.id) {
            Some(existing) => *existing = slot,
            None => slots.push(slot),
        }
    }
}

#[async_trait]
impl ScheduleCatalog for InMemoryCatalog {
    async fn slots_for_weekday(&self, weekday: WeekdayName) -> BookingResult<Vec<TimeSlot>> {
        let mut slots: Vec<TimeSlot> = self
            .slots
            .read()
            .iter()
            .filter(|slot| slot.weekday == weekday)
            .cloned()
            .collect();
        sort_by_start(&mut slots);
        Ok(slots)
    }

    async fn find_slot(&self, id: SlotId) -> BookingResult<Option<TimeSlot>> {
        Ok(self.slots.read().iter().find(|slot| slot.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn slot(weekday: WeekdayName, hour: u32) -> TimeSlot {
        TimeSlot::new(
            SlotId::new(),
            weekday,
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            2,
            2,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn filters_weekday_and_sorts_by_start() {
        let late = slot(WeekdayName::Martes, 18);
        let early = slot(WeekdayName::Martes, 6);
        let other = slot(WeekdayName::Lunes, 7);
        let catalog = InMemoryCatalog::with_slots([late.clone(), other, early.clone()]);

        let slots = catalog.slots_for_weekday(WeekdayName::Martes).await.unwrap();
        assert_eq!(slots, vec![early, late]);
        assert!(catalog
            .slots_for_weekday(WeekdayName::Domingo)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let mut s = slot(WeekdayName::Lunes, 6);
        let catalog = InMemoryCatalog::with_slots([s.clone()]);
        s.capacity_male = 9;
        catalog.upsert(s.clone());
        assert_eq!(catalog.find_slot(s.id).await.unwrap(), Some(s));
        assert_eq!(catalog.find_slot(SlotId::new()).await.unwrap(), None);
    }
}
