//! Booking server: HTTP schedule query, live websocket channel and rollover monitor.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use gym_booking::builders::build_service;
use gym_booking::config::BookingConfig;
use gym_booking::runtime::{router, AppState, JwtVerifier, TokioSpawner};
use gym_booking::util::telemetry::init_tracing;

fn main() -> Result<()> {
    init_tracing("info,gym_booking=debug");
    let cfg = BookingConfig::from_env().context("failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.worker_threads)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(bootstrap(cfg))
}

async fn bootstrap(cfg: BookingConfig) -> Result<()> {
    let service = build_service(&cfg).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());
    service
        .rollover_monitor(
            Duration::from_secs(cfg.rollover_poll_secs),
            chrono::Duration::seconds(i64::try_from(cfg.rollover_grace_secs).unwrap_or(i64::MAX)),
        )
        .spawn_on(&spawner, shutdown_rx);

    let app = router(AppState::new(service, JwtVerifier::new(&cfg.jwt_secret))).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    );

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, timezone = %cfg.timezone, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")
        .inspect_err(|e| tracing::error!(error.cause_chain = ?e, error.message = %e, "server error"));

    let _ = shutdown_tx.send(true);
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
