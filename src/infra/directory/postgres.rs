//! Postgres user directory over the `users` table.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::directory::UserDirectory;
use crate::core::gender::GenderBucket;
use crate::core::BookingResult;
use crate::infra::postgres::db_error;
use crate::util::serde::UserId;

#[derive(FromRow)]
struct GenderRow {
    id: Uuid,
    gender_bucket: Option<String>,
}

/// Directory reader over a `PgPool`.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// DDL for `users`. Only the columns the booking core reads are declared.
    pub fn migrations() -> &'static [&'static str] {
        &[r"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    name TEXT,
    role TEXT NOT NULL DEFAULT 'pendiente',
    gender_bucket TEXT CHECK (gender_bucket IN ('M', 'F'))
)"]
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn genders_of(
        &self,
        users: &[UserId],
    ) -> BookingResult<HashMap<UserId, Option<GenderBucket>>> {
        if users.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = users.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<GenderRow> =
            sqlx::query_as("SELECT id, gender_bucket FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let bucket = row.gender_bucket.as_deref().and_then(GenderBucket::from_code);
                (UserId::from_uuid(row.id), bucket)
            })
            .collect())
    }
}
