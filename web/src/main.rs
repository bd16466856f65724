//! Carebook booking server.
//!
//! Wires the in-memory engine together and serves the booking API until
//! SIGINT/SIGTERM.

use carebook_core::environment::{Clock, SystemClock};
use carebook_core::events::TracingEventSink;
use carebook_core::payment::MockPaymentGateway;
use carebook_core::prelude::{InMemoryAvailabilityStore, InMemoryBookingRepository};
use carebook_core::service::BookingService;
use carebook_web::{build_router, AppState, Config};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment files are optional outside development
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carebook_core=info,carebook_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        hold_duration_secs = config.engine.hold_duration_secs,
        policy = ?config.engine.confirmation_policy,
        "carebook booking server starting"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let availability = Arc::new(InMemoryAvailabilityStore::new(clock.clone()));
    let repository = Arc::new(InMemoryBookingRepository::new());

    let service = Arc::new(BookingService::new(
        availability.clone(),
        repository,
        MockPaymentGateway::shared(),
        Arc::new(TracingEventSink),
        clock,
        config.engine.to_engine_config(),
    ));

    // Background reconciliation: frees holds orphaned past their expiry
    let sweeper = service.clone().spawn_hold_sweeper();

    let app = build_router(AppState::new(service, availability));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let interrupt = async {
        signal::ctrl_c()
            .await
            .expect("install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("SIGINT received, draining"),
        () = terminate => info!("SIGTERM received, draining"),
    }
}
