//! # Gym Booking
//!
//! Real-time class booking core for a gym: which day is open for booking,
//! how many seats each class has left per gender bucket, and a
//! concurrency-safe reserve/cancel protocol that pushes live updates to every
//! connected client.
//!
//! ## Core Problem Solved
//!
//! Classes have separate seat counts for men and women, members book from
//! phones at the same moment, and the booking day flips at an evening cutoff
//! rather than at midnight:
//!
//! - **Active Day**: before the configured cutoff (default `21:00`, operating
//!   timezone `America/Costa_Rica`) members book today; at or after it, tomorrow
//! - **Per-Bucket Capacity**: every slot tracks bucket A and bucket B separately
//! - **No Overbooking**: reservations are inserted, verified against capacity
//!   and rolled back when they lost a race
//! - **Self-Cleaning Store**: a reservation expires at its day's cutoff and the
//!   store stops returning it without any cleanup job
//!
//! ## Reserving a Seat
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gym_booking::builders::{build_service_with, InMemoryBackends};
//! use gym_booking::config::BookingConfig;
//! use gym_booking::core::{GenderBucket, SessionIdentity};
//! use gym_booking::util::clock::SystemClock;
//!
//! let clock = Arc::new(SystemClock);
//! let mem = InMemoryBackends::new(clock.clone());
//! let service = build_service_with(&BookingConfig::with_secret("k"), mem.backends(), clock)?;
//!
//! let member = SessionIdentity::new(user_id, Some(GenderBucket::Female));
//! let ack = service.protocol().reserve(&member, Some(&slot_id.to_string())).await;
//! assert!(ack.ok);
//! ```
//!
//! For complete examples, see:
//! - `tests/protocol_test.rs` - reservation races, cancel and expiry
//! - `tests/api_test.rs` - HTTP surface

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Booking core: active day, capacity accounting, reservation protocol and broadcast.
pub mod core;
/// Configuration models for the service, backends and timings.
pub mod config;
/// Builders that assemble the booking service from configuration.
pub mod builders;
/// Infrastructure adapters for reservations, slots, users and the cutoff.
pub mod infra;
/// Runtime adapters: HTTP, websocket, authentication and spawning.
pub mod runtime;
/// Shared utilities.
pub mod util;
