//! In-memory reservation store with uniqueness and expiry enforcement.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::store::{BookingStore, NewReservation, Reservation};
use crate::core::{BookingResult, ConflictKind};
use crate::util::clock::{Clock, SystemClock};
use crate::util::serde::{ReservationId, SlotId, UserId};

type Key = (DateTime<Utc>, SlotId, UserId);

#[derive(Default)]
struct State {
    next_seq: i64,
    /// Rows ordered by `seq`.
    rows: BTreeMap<i64, Reservation>,
    unique: HashMap<Key, i64>,
}

impl State {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<i64> = self
            .rows
            .iter()
            .filter(|(_, row)| row.expires_at <= now)
            .map(|(seq, _)| *seq)
            .collect();
        for seq in &expired {
            self.remove(*seq);
        }
        expired.len()
    }

    fn remove(&mut self, seq: i64) -> Option<Reservation> {
        let row = self.rows.remove(&seq)?;
        self.unique.remove(&(row.day, row.slot_id, row.user_id));
        Some(row)
    }

    fn live_seq(&self, key: &Key, now: DateTime<Utc>) -> Option<i64> {
        let seq = *self.unique.get(key)?;
        self.rows
            .get(&seq)
            .filter(|row| row.expires_at > now)
            .map(|_| seq)
    }
}

/// Reservation store held in process memory.
///
/// Expired rows are invisible to every read and are purged on each write.
#[derive(Clone)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryBookingStore {
    /// Create an empty store that judges expiry against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Number of rows currently held, expired ones included.
    pub fn raw_len(&self) -> usize {
        self.state.lock().rows.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, new: NewReservation) -> BookingResult<Reservation> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let purged = state.purge_expired(now);
        if purged > 0 {
            tracing::debug!(purged, "purged expired reservations");
        }

        let key = (new.day, new.slot_id, new.user_id);
        if state.unique.contains_key(&key) {
            return Err(ConflictKind::AlreadyReserved.into());
        }

        state.next_seq += 1;
        let row = Reservation {
            id: ReservationId::new(),
            seq: state.next_seq,
            slot_id: new.slot_id,
            user_id: new.user_id,
            day: new.day,
            expires_at: new.expires_at,
            created_at: now,
        };
        state.unique.insert(key, row.seq);
        state.rows.insert(row.seq, row.clone());
        Ok(row)
    }

    async fn find(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<Option<Reservation>> {
        let now = self.clock.now();
        let state = self.state.lock();
        Ok(state
            .live_seq(&(day, slot_id, user_id), now)
            .and_then(|seq| state.rows.get(&seq).cloned()))
    }

    async fn delete(&self, id: ReservationId) -> BookingResult<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.purge_expired(now);
        let seq = state
            .rows
            .iter()
            .find(|(_, row)| row.id == id)
            .map(|(seq, _)| *seq);
        Ok(seq.and_then(|seq| state.remove(seq)).is_some())
    }

    async fn delete_matching(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.purge_expired(now);
        let seq = state.unique.get(&(day, slot_id, user_id)).copied();
        Ok(seq.and_then(|seq| state.remove(seq)).is_some())
    }

    async fn list(&self, day: DateTime<Utc>, slot_ids: &[SlotId]) -> BookingResult<Vec<Reservation>> {
        let now = self.clock.now();
        let state = self.state.lock();
        Ok(state
            .rows
            .values()
            .filter(|row| row.day == day && row.expires_at > now && slot_ids.contains(&row.slot_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BookingError;
    use crate::util::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    fn fixture() -> (InMemoryBookingStore, ManualClock, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let clock = ManualClock::new(now);
        let store = InMemoryBookingStore::new(Arc::new(clock.clone()));
        let day = Utc.with_ymd_and_hms(2025, 3, 4, 6, 0, 0).unwrap();
        (store, clock, day)
    }

    fn new_row(day: DateTime<Utc>, slot: SlotId, user: UserId) -> NewReservation {
        NewReservation {
            slot_id: slot,
            user_id: user,
            day,
            expires_at: day + Duration::hours(21),
        }
    }

    #[tokio::test]
    async fn duplicate_triple_is_a_conflict() {
        let (store, _, day) = fixture();
        let (slot, user) = (SlotId::new(), UserId::new());
        store.insert(new_row(day, slot, user)).await.unwrap();
        let err = store.insert(new_row(day, slot, user)).await.unwrap_err();
        assert_eq!(err, BookingError::Conflict(ConflictKind::AlreadyReserved));
    }

    #[tokio::test]
    async fn seq_increases_and_list_is_ordered() {
        let (store, _, day) = fixture();
        let slot = SlotId::new();
        let a = store.insert(new_row(day, slot, UserId::new())).await.unwrap();
        let b = store.insert(new_row(day, slot, UserId::new())).await.unwrap();
        assert!(b.seq > a.seq);
        let rows = store.list(day, &[slot]).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![a.seq, b.seq]);
    }

    #[tokio::test]
    async fn list_filters_by_day_and_slot() {
        let (store, _, day) = fixture();
        let (s1, s2) = (SlotId::new(), SlotId::new());
        store.insert(new_row(day, s1, UserId::new())).await.unwrap();
        store.insert(new_row(day, s2, UserId::new())).await.unwrap();
        store
            .insert(new_row(day + Duration::days(1), s1, UserId::new()))
            .await
            .unwrap();
        assert_eq!(store.list(day, &[s1]).await.unwrap().len(), 1);
        assert_eq!(store.list(day, &[s1, s2]).await.unwrap().len(), 2);
        assert!(store.list(day, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_rows_vanish_and_free_the_triple() {
        let (store, clock, day) = fixture();
        let (slot, user) = (SlotId::new(), UserId::new());
        store.insert(new_row(day, slot, user)).await.unwrap();

        clock.set(day + Duration::hours(21));
        assert!(store.find(day, slot, user).await.unwrap().is_none());
        assert!(store.list(day, &[slot]).await.unwrap().is_empty());
        assert_eq!(store.raw_len(), 1);

        store.insert(new_row(day, slot, user)).await.unwrap();
        assert_eq!(store.raw_len(), 1);
    }

    #[tokio::test]
    async fn deletes_report_whether_a_row_went_away() {
        let (store, _, day) = fixture();
        let (slot, user) = (SlotId::new(), UserId::new());
        let row = store.insert(new_row(day, slot, user)).await.unwrap();
        assert!(store.delete(row.id).await.unwrap());
        assert!(!store.delete(row.id).await.unwrap());

        store.insert(new_row(day, slot, user)).await.unwrap();
        assert!(store.delete_matching(day, slot, user).await.unwrap());
        assert!(!store.delete_matching(day, slot, user).await.unwrap());
    }
}
