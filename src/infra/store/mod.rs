//! Reservation store backends.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryBookingStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBookingStore;
