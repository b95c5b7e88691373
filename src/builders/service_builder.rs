//! Assemble a [`BookingService`] from configuration and backends.

use std::sync::Arc;

use crate::config::{BookingConfig, StoreBackendConfig};
use crate::core::audit::shared_sink;
use crate::core::{
    ActiveDayResolver, BookingService, BookingStore, BroadcastHub, CapacityAccounting,
    CutoffSource, InMemoryAuditSink, ScheduleCatalog, UserDirectory,
};
use crate::core::AppResult;
use crate::infra::{InMemoryBookingStore, InMemoryCatalog, InMemoryUserDirectory, StaticCutoffSource};
use crate::util::clock::{Clock, SystemClock};

/// Collaborators the booking core reads from and writes to.
#[derive(Clone)]
pub struct Backends {
    /// Slot definitions.
    pub catalog: Arc<dyn ScheduleCatalog>,
    /// Reservations.
    pub store: Arc<dyn BookingStore>,
    /// Users' gender buckets.
    pub directory: Arc<dyn UserDirectory>,
    /// Configured cutoff.
    pub cutoff: Arc<dyn CutoffSource>,
}

/// In-memory backends with concrete handles kept for seeding.
#[derive(Clone)]
pub struct InMemoryBackends {
    /// Slot definitions.
    pub catalog: InMemoryCatalog,
    /// Reservations.
    pub store: InMemoryBookingStore,
    /// Users.
    pub directory: InMemoryUserDirectory,
    /// Cutoff value.
    pub cutoff: StaticCutoffSource,
}

impl InMemoryBackends {
    /// Empty backends; the store judges expiry with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: InMemoryCatalog::default(),
            store: InMemoryBookingStore::new(clock),
            directory: InMemoryUserDirectory::new(),
            cutoff: StaticCutoffSource::default(),
        }
    }

    /// Type-erased view sharing the same state.
    pub fn backends(&self) -> Backends {
        Backends {
            catalog: Arc::new(self.catalog.clone()),
            store: Arc::new(self.store.clone()),
            directory: Arc::new(self.directory.clone()),
            cutoff: Arc::new(self.cutoff.clone()),
        }
    }
}

/// Build a service over explicit backends and clock.
pub fn build_service_with(
    cfg: &BookingConfig,
    backends: Backends,
    clock: Arc<dyn Clock>,
) -> AppResult<BookingService> {
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("config invalid: {e}"))?;
    let tz = cfg.tz().map_err(anyhow::Error::msg)?;

    let resolver = ActiveDayResolver::new(clock, tz, backends.cutoff, cfg.default_cutoff);
    let accounting =
        CapacityAccounting::new(resolver, backends.catalog, backends.store, backends.directory);
    let service = BookingService::new(accounting, BroadcastHub::new());

    Ok(if cfg.audit_buffer > 0 {
        service.with_audit(shared_sink(InMemoryAuditSink::new(cfg.audit_buffer)))
    } else {
        service
    })
}

/// Build a service with the backend selected by `cfg.store`.
pub async fn build_service(cfg: &BookingConfig) -> AppResult<BookingService> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backends = match cfg.store {
        StoreBackendConfig::InMemory => {
            tracing::warn!("using the in-memory store; reservations are lost on restart");
            InMemoryBackends::new(clock.clone()).backends()
        }
        StoreBackendConfig::Postgres => postgres_backends(cfg).await?,
    };
    build_service_with(cfg, backends, clock)
}

#[cfg(feature = "postgres")]
async fn postgres_backends(cfg: &BookingConfig) -> AppResult<Backends> {
    use anyhow::Context;

    use crate::infra::{
        run_migrations, PostgresBookingStore, PostgresCatalog, PostgresCutoffSource,
        PostgresUserDirectory,
    };

    let url = cfg
        .database_url
        .as_deref()
        .context("database_url is required for the postgres store")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(cfg.database_max_connections)
        .connect(url)
        .await
        .context("failed to connect to postgres")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;
    tracing::info!("connected to postgres");

    Ok(Backends {
        catalog: Arc::new(PostgresCatalog::new(pool.clone())),
        store: Arc::new(PostgresBookingStore::new(pool.clone())),
        directory: Arc::new(PostgresUserDirectory::new(pool.clone())),
        cutoff: Arc::new(PostgresCutoffSource::new(pool)),
    })
}

#[cfg(not(feature = "postgres"))]
async fn postgres_backends(_cfg: &BookingConfig) -> AppResult<Backends> {
    anyhow::bail!("this build does not include the postgres feature")
}
