//! Benchmarks for occupancy accounting and the reserve path.
//!
//! Benchmarks cover:
//! - Tallying a day's reservations into per-slot counts
//! - Ranking a fresh row inside a crowded slot
//! - Reserve/cancel against the in-memory backends

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use gym_booking::builders::{build_service_with, InMemoryBackends};
use gym_booking::config::BookingConfig;
use gym_booking::core::occupancy::{tally, GenderMap, SlotLedger};
use gym_booking::core::{GenderBucket, Reservation, SessionIdentity, TimeSlot, WeekdayName};
use gym_booking::util::clock::ManualClock;
use gym_booking::util::serde::{ReservationId, SlotId, UserId};
use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn build_rows(count: u64, slots: &[SlotId]) -> (Vec<Reservation>, GenderMap) {
    let day = Utc.with_ymd_and_hms(2025, 3, 4, 6, 0, 0).unwrap();
    let mut genders = HashMap::new();
    let rows = (0..count)
        .map(|i| {
            let user = UserId::new();
            let bucket = match i % 3 {
                0 => Some(GenderBucket::Male),
                1 => Some(GenderBucket::Female),
                _ => None,
            };
            genders.insert(user, bucket);
            Reservation {
                id: ReservationId::new(),
                seq: i64::try_from(i).unwrap(),
                slot_id: slots[usize::try_from(i).unwrap() % slots.len()],
                user_id: user,
                day,
                expires_at: day + Duration::hours(21),
                created_at: day,
            }
        })
        .collect();
    (rows, genders)
}

// ============================================================================
// Accounting Benchmarks
// ============================================================================

fn bench_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("occupancy_tally");
    let slots: Vec<SlotId> = (0..12).map(|_| SlotId::new()).collect();

    for size in [100, 1_000, 10_000] {
        let (rows, genders) = build_rows(size, &slots);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(tally(&rows, &genders, &slots)));
        });
    }
    group.finish();
}

fn bench_rank_of(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_rank_of");
    let slot = SlotId::new();

    for size in [10, 100, 1_000] {
        let (rows, genders) = build_rows(size, &[slot]);
        let last = rows[rows.len() - 1].clone();
        let ledger = SlotLedger {
            slot_id: slot,
            rows,
            genders,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(ledger.rank_of(&last, GenderBucket::Female)));
        });
    }
    group.finish();
}

// ============================================================================
// Protocol Benchmarks
// ============================================================================

fn bench_reserve_cancel(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 4, 15, 0, 0).unwrap());
    let mem = InMemoryBackends::new(Arc::new(clock.clone()));
    let service = build_service_with(
        &BookingConfig::with_secret("bench"),
        mem.backends(),
        Arc::new(clock),
    )
    .unwrap();

    let slot = TimeSlot::new(
        SlotId::new(),
        WeekdayName::Martes,
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        30,
        30,
    )
    .unwrap();
    mem.catalog.upsert(slot.clone());
    let user = UserId::new();
    mem.directory.insert(user, Some(GenderBucket::Male));
    let member = SessionIdentity::new(user, Some(GenderBucket::Male));
    let raw = slot.id.to_string();

    c.bench_function("reserve_then_cancel", |b| {
        b.to_async(&rt).iter(|| async {
            let reserved = service.protocol().reserve(&member, Some(&raw)).await;
            let cancelled = service.protocol().cancel(&member, Some(&raw)).await;
            black_box((reserved, cancelled));
        });
    });
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(accounting_benches, bench_tally, bench_rank_of);

criterion_group!(protocol_benches, bench_reserve_cancel);

criterion_main!(accounting_benches, protocol_benches);
