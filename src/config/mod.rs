//! Configuration models for the booking service, its backends and timings.

pub mod booking;

pub use booking::{BookingConfig, ConfigError, StoreBackendConfig};
