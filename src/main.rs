//! Fastest-finger backend entrypoint wiring REST and SSE layers over the
//! shared round store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod dto;
mod error;
mod routes;
mod services;
mod state;
mod store;

use config::AppConfig;
use state::{AppState, SharedState, clock::SystemClock, round::RoundState};
use store::{keys, memory::MemoryStore};

const GAME_ID_ENV: &str = "FASTEST_FINGER_GAME_ID";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let state = AppState::new(
        config,
        resolve_game_id(),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
    );

    bootstrap_round_state(&state).await?;
    tokio::spawn(services::phase_guard::run_phase_guard(state.clone()));

    let app = build_router(state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Game session identifier hosted by this process, taken from the
/// environment so clients can be handed a stable id, or freshly generated.
fn resolve_game_id() -> Uuid {
    match env::var(GAME_ID_ENV) {
        Ok(raw) => match raw.parse() {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "invalid {GAME_ID_ENV}; generating a game id");
                Uuid::new_v4()
            }
        },
        Err(_) => Uuid::new_v4(),
    }
}

/// Seed the singleton round-state document on first boot.
async fn bootstrap_round_state(state: &SharedState) -> anyhow::Result<()> {
    let key = keys::round_state(state.game_id());
    if state
        .store()
        .get(&key)
        .await
        .context("probing round store")?
        .is_none()
    {
        let round = RoundState {
            updated_at: state.clock().now_ms(),
            ..RoundState::default()
        };
        state
            .store()
            .set(&key, serde_json::to_value(&round)?)
            .await
            .context("seeding round state")?;
    }
    info!(game = %state.game_id(), "game session ready; players can register");
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
