//! Infrastructure adapters: in-memory and Postgres backends for the booking core.

pub mod catalog;
pub mod cutoff;
pub mod directory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use catalog::InMemoryCatalog;
pub use cutoff::StaticCutoffSource;
pub use directory::InMemoryUserDirectory;
pub use store::InMemoryBookingStore;

#[cfg(feature = "postgres")]
pub use catalog::PostgresCatalog;
#[cfg(feature = "postgres")]
pub use cutoff::PostgresCutoffSource;
#[cfg(feature = "postgres")]
pub use directory::PostgresUserDirectory;
#[cfg(feature = "postgres")]
pub use postgres::{migrations, run_migrations};
#[cfg(feature = "postgres")]
pub use store::PostgresBookingStore;
