//! Cutoff sources backed by the gym's visual configuration.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::StaticCutoffSource;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCutoffSource;
