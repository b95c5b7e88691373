//! Postgres reservation store.
//!
//! Uniqueness comes from the `(day, slot_id, user_id)` constraint and expiry from
//! the `expires_at > NOW()` predicate on every read; expired rows are purged in
//! the same transaction as each insert, skipping rows another purge holds.
//! Inserts into one (day, slot) pair are serialised with a transaction-scoped advisory lock so `seq` order matches
//! commit order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::store::{BookingStore, NewReservation, Reservation};
use crate::core::BookingResult;
use crate::infra::postgres::db_error;
use crate::util::serde::{ReservationId, SlotId, UserId};

const COLUMNS: &str = "id, seq, slot_id, user_id, day, expires_at, created_at";

#[derive(FromRow)]
struct ReservationRow {
    id: Uuid,
    seq: i64,
    slot_id: Uuid,
    user_id: Uuid,
    day: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: ReservationId::from_uuid(row.id),
            seq: row.seq,
            slot_id: SlotId::from_uuid(row.slot_id),
            user_id: UserId::from_uuid(row.user_id),
            day: row.day,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Reservation store over a `PgPool`.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// DDL for the reservations table.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS reservations (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL,
    slot_id UUID NOT NULL REFERENCES time_slots (id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    day TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_reservations_day_slot_user UNIQUE (day, slot_id, user_id)
)",
            "CREATE INDEX IF NOT EXISTS idx_reservations_expires_at ON reservations (expires_at)",
            "CREATE INDEX IF NOT EXISTS idx_reservations_day_slot ON reservations (day, slot_id, seq)",
        ]
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn insert(&self, new: NewReservation) -> BookingResult<Reservation> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let purged = sqlx::query(
            "DELETE FROM reservations WHERE id IN (\
             SELECT id FROM reservations WHERE expires_at <= NOW() FOR UPDATE SKIP LOCKED)",
        )
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "purged expired reservations");
        }

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}|{}", new.day.timestamp(), new.slot_id))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let row: ReservationRow = sqlx::query_as(&format!(
            "INSERT INTO reservations (id, slot_id, user_id, day, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.slot_id)
        .bind(new.user_id)
        .bind(new.day)
        .bind(new.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn find(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reservations \
             WHERE day = $1 AND slot_id = $2 AND user_id = $3 AND expires_at > NOW()"
        ))
        .bind(day)
        .bind(slot_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: ReservationId) -> BookingResult<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_matching(
        &self,
        day: DateTime<Utc>,
        slot_id: SlotId,
        user_id: UserId,
    ) -> BookingResult<bool> {
        let result = sqlx::query(
            "DELETE FROM reservations \
             WHERE day = $1 AND slot_id = $2 AND user_id = $3 AND expires_at > NOW()",
        )
        .bind(day)
        .bind(slot_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, day: DateTime<Utc>, slot_ids: &[SlotId]) -> BookingResult<Vec<Reservation>> {
        if slot_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = slot_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reservations \
             WHERE day = $1 AND slot_id = ANY($2) AND expires_at > NOW() \
             ORDER BY seq"
        ))
        .bind(day)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
