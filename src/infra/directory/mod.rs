//! User directory backends.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryUserDirectory;
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserDirectory;
