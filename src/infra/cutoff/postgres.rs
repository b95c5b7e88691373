//! Cutoff read from the newest `visual_config` row.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::calendar::CutoffSource;
use crate::core::BookingResult;
use crate::infra::postgres::db_error;

/// Visual-config reader over a `PgPool`.
#[derive(Clone)]
pub struct PostgresCutoffSource {
    pool: PgPool,
}

impl PostgresCutoffSource {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// DDL for `visual_config`.
    pub fn migrations() -> &'static [&'static str] {
        &[r"
CREATE TABLE IF NOT EXISTS visual_config (
    id BIGSERIAL PRIMARY KEY,
    booking_cutoff TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"]
    }
}

#[async_trait]
impl CutoffSource for PostgresCutoffSource {
    async fn raw_cutoff(&self) -> BookingResult<Option<String>> {
        let value: Option<Option<String>> = sqlx::query_scalar(
            "SELECT booking_cutoff FROM visual_config ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(value.flatten())
    }
}
