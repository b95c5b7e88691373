//! Mutable in-process cutoff value.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::calendar::CutoffSource;
use crate::core::BookingResult;

/// Cutoff held in memory; `None` means the gym never configured one.
#[derive(Clone, Default)]
pub struct StaticCutoffSource {
    raw: Arc<RwLock<Option<String>>>,
}

impl StaticCutoffSource {
    /// Source returning `raw` verbatim.
    pub fn new(raw: Option<String>) -> Self {
        Self {
            raw: Arc::new(RwLock::new(raw)),
        }
    }

    /// Replace the configured value, as an admin edit would.
    pub fn set(&self, raw: Option<String>) {
        *self.raw.write() = raw;
    }
}

#[async_trait]
impl CutoffSource for StaticCutoffSource {
    async fn raw_cutoff(&self) -> BookingResult<Option<String>> {
        Ok(self.raw.read().clone())
    }
}
