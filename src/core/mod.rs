//! Booking core: active-day rules, capacity accounting and the reservation protocol.

pub mod audit;
pub mod broadcast;
pub mod calendar;
pub mod catalog;
pub mod directory;
pub mod error;
pub mod gender;
pub mod identity;
pub mod occupancy;
pub mod protocol;
pub mod rollover;
pub mod service;
pub mod store;

pub use audit::{
    build_audit_event, shared_sink, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink,
    PostgresAuditSink, SharedAuditSink,
};
pub use broadcast::{BroadcastHub, ServerEvent};
pub use calendar::{
    active_day_at, cutoff_moment, midnight_of, ActiveDay, ActiveDayResolver, CutoffSource,
    CutoffTime, WeekdayName, DEFAULT_CUTOFF,
};
pub use catalog::{ScheduleCatalog, TimeSlot};
pub use directory::UserDirectory;
pub use error::{AppResult, BookingError, BookingResult, ConflictKind};
pub use gender::GenderBucket;
pub use identity::{Role, SessionIdentity};
pub use occupancy::{ActiveSchedule, CapacityAccounting, SlotLedger, SlotOccupancy, SlotView};
pub use protocol::{parse_slot_id, Ack, ReservationProtocol, Transition};
pub use rollover::{RolloverMonitor, RolloverState, Spawn};
pub use service::BookingService;
pub use store::{BookingStore, NewReservation, Reservation};
