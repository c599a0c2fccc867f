use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_api::{app, worker, AppState, AuthConfig};
use marquee_core::SystemClock;
use marquee_store::app_config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marquee_api=debug,marquee_hold=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let state = AppState::new(
        &config.reservation,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        Arc::new(SystemClock),
    );

    for seed in &config.catalog.shows {
        let layout = seed.layout()?;
        let seats = state
            .seed_show(seed.show(), &layout)
            .await
            .with_context(|| format!("Failed to seed show {}", seed.id))?;
        tracing::info!("Seeded show {} '{}' with {} seats", seed.id, seed.title, seats);
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = worker::start_expiry_worker(
        &state,
        Duration::from_secs(config.reservation.sweep_interval_seconds),
        shutdown_rx,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper.await?;
    tracing::info!("Shut down cleanly");
    Ok(())
}
