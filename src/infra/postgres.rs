//! Shared Postgres plumbing: schema migrations and error mapping.

use sqlx::PgPool;

use crate::core::{BookingError, BookingResult, ConflictKind};

/// Schema for every Postgres-backed collaborator, in dependency order.
pub fn migrations() -> Vec<&'static str> {
    let mut all = Vec::new();
    all.extend_from_slice(super::catalog::PostgresCatalog::migrations());
    all.extend_from_slice(super::directory::PostgresUserDirectory::migrations());
    all.extend_from_slice(super::cutoff::PostgresCutoffSource::migrations());
    all.extend_from_slice(super::store::PostgresBookingStore::migrations());
    all.extend_from_slice(crate::core::audit::PostgresAuditSink::migrations());
    all
}

/// Apply [`migrations`] one statement at a time.
pub async fn run_migrations(pool: &PgPool) -> BookingResult<()> {
    for statement in migrations() {
        sqlx::query(statement).execute(pool).await.map_err(db_error)?;
    }
    tracing::info!("database schema is up to date");
    Ok(())
}

/// Translate driver errors; unique violations become duplicate-reservation conflicts.
pub(crate) fn db_error(err: sqlx::Error) -> BookingError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ConflictKind::AlreadyReserved.into()
        }
        _ => {
            tracing::error!(error = %err, "postgres operation failed");
            BookingError::backend(err.to_string())
        }
    }
}
