//! Schedule catalog backends.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryCatalog;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCatalog;
