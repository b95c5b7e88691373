//! Postgres schedule catalog over the `time_slots` table.

use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::calendar::WeekdayName;
use crate::core::catalog::{ScheduleCatalog, TimeSlot};
use crate::core::{BookingError, BookingResult};
use crate::infra::postgres::db_error;
use crate::util::serde::SlotId;

#[derive(FromRow)]
struct SlotRow {
    id: Uuid,
    weekday: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    capacity_male: i32,
    capacity_female: i32,
}

impl TryFrom<SlotRow> for TimeSlot {
    type Error = BookingError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        let weekday = row.weekday.parse::<WeekdayName>().map_err(BookingError::backend)?;
        let capacity = |v: i32| {
            u32::try_from(v)
                .map_err(|_| BookingError::backend(format!("slot {} has negative capacity", row.id)))
        };
        Self::new(
            SlotId::from_uuid(row.id),
            weekday,
            row.start_time,
            row.end_time,
            capacity(row.capacity_male)?,
            capacity(row.capacity_female)?,
        )
    }
}

/// Catalog reader over a `PgPool`.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// DDL for `time_slots`.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS time_slots (
    id UUID PRIMARY KEY,
    weekday TEXT NOT NULL,
    start_time TIME NOT NULL,
    end_time TIME NOT NULL,
    capacity_male INT NOT NULL DEFAULT 0 CHECK (capacity_male >= 0),
    capacity_female INT NOT NULL DEFAULT 0 CHECK (capacity_female >= 0),
    CHECK (start_time < end_time)
)",
            "CREATE INDEX IF NOT EXISTS idx_time_slots_weekday ON time_slots (weekday, start_time)",
        ]
    }
}

#[async_trait]
impl ScheduleCatalog for PostgresCatalog {
    async fn slots_for_weekday(&self, weekday: WeekdayName) -> BookingResult<Vec<TimeSlot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT id, weekday, start_time, end_time, capacity_male, capacity_female \
             FROM time_slots WHERE weekday = $1 ORDER BY start_time, id",
        )
        .bind(weekday.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(TimeSlot::try_from).collect()
    }

    async fn find_slot(&self, id: SlotId) -> BookingResult<Option<TimeSlot>> {
        let row: Option<SlotRow> = sqlx::query_as(
            "SELECT id, weekday, start_time, end_time, capacity_male, capacity_female \
             FROM time_slots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TimeSlot::try_from).transpose()
    }
}
