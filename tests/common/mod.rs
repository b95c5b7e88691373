//! Shared fixtures: an in-memory booking service on a manual clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use gym_booking::builders::InMemoryBackends;
use gym_booking::core::{
    shared_sink, ActiveDayResolver, BookingService, BroadcastHub, CapacityAccounting, GenderBucket,
    InMemoryAuditSink, Role, SessionIdentity, TimeSlot, WeekdayName, DEFAULT_CUTOFF,
};
use gym_booking::util::clock::ManualClock;
use gym_booking::util::serde::{SlotId, UserId};

pub const CR: Tz = chrono_tz::America::Costa_Rica;

/// Wall-clock time in Costa Rica (UTC-6, no DST) as a UTC instant.
pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    CR.with_ymd_and_hms(y, mo, d, h, mi, s)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

/// Tuesday 2025-03-04, mid-morning.
pub fn tuesday_morning() -> DateTime<Utc> {
    local(2025, 3, 4, 9, 0, 0)
}

pub struct Harness {
    pub clock: ManualClock,
    pub mem: InMemoryBackends,
    pub audit: InMemoryAuditSink,
    pub service: BookingService,
}

impl Harness {
    pub fn at(now: DateTime<Utc>) -> Self {
        let clock = ManualClock::new(now);
        let mem = InMemoryBackends::new(Arc::new(clock.clone()));
        let backends = mem.backends();
        let resolver =
            ActiveDayResolver::new(Arc::new(clock.clone()), CR, backends.cutoff, DEFAULT_CUTOFF);
        let accounting =
            CapacityAccounting::new(resolver, backends.catalog, backends.store, backends.directory);
        let audit = InMemoryAuditSink::new(256);
        let service =
            BookingService::new(accounting, BroadcastHub::new()).with_audit(shared_sink(audit.clone()));
        Self {
            clock,
            mem,
            audit,
            service,
        }
    }

    /// Add a one-hour slot to the catalog.
    pub fn slot(&self, weekday: WeekdayName, hour: u32, male: u32, female: u32) -> TimeSlot {
        let slot = TimeSlot::new(
            SlotId::new(),
            weekday,
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            male,
            female,
        )
        .unwrap();
        self.mem.catalog.upsert(slot.clone());
        slot
    }

    /// Register a client in the directory and return their session identity.
    pub fn member(&self, gender: Option<GenderBucket>) -> SessionIdentity {
        let user = UserId::new();
        self.mem.directory.insert(user, gender);
        SessionIdentity::new(user, gender).with_role(Role::Client)
    }

    pub async fn reserve(&self, who: &SessionIdentity, slot: &TimeSlot) -> gym_booking::core::Ack {
        self.service
            .protocol()
            .reserve(who, Some(&slot.id.to_string()))
            .await
    }

    pub async fn cancel(&self, who: &SessionIdentity, slot: &TimeSlot) -> gym_booking::core::Ack {
        self.service
            .protocol()
            .cancel(who, Some(&slot.id.to_string()))
            .await
    }

    /// (male, female) occupancy of a slot on the current active day.
    pub async fn counts(&self, slot: &TimeSlot) -> (u32, u32) {
        let day = self.service.accounting().resolver().resolve().await;
        let occ = self
            .service
            .accounting()
            .occupancy(day.midnight, &[slot.id])
            .await
            .unwrap();
        let o = &occ[&slot.id];
        (o.male, o.female)
    }
}
