//! Leaderboard backend entrypoint wiring the shared store, the competition controller,
//! REST and SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leaderboard_back::{
    config::AppConfig,
    dao::score_store::{ScoreStore, memory::MemoryScoreStore},
    routes,
    services::competition_service,
    state::{AppState, SharedState, clock::SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;

    let store = connect_store().await?;
    let app_state = AppState::new(store, config, Arc::new(SystemClock));

    // Store failures are already on the board; keep serving so the display can show them.
    if let Err(err) = competition_service::restore(&app_state).await {
        warn!(error = %err, "failed to restore competition state");
    }

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.teardown().await;
    Ok(())
}

/// Connect to Firebase when a database URL is configured, otherwise fall back to an
/// in-memory tree.
#[cfg(feature = "firebase-store")]
async fn connect_store() -> anyhow::Result<Arc<dyn ScoreStore>> {
    use leaderboard_back::dao::score_store::firebase::{
        FirebaseConfig, FirebaseDaoError, FirebaseScoreStore,
    };

    match FirebaseConfig::from_env() {
        Ok(config) => {
            let store = FirebaseScoreStore::connect(config)
                .await
                .context("connecting to Firebase")?;
            info!("connected to Firebase realtime database");
            Ok(Arc::new(store))
        }
        Err(FirebaseDaoError::MissingEnvVar { var }) => {
            warn!(var, "Firebase not configured; using in-memory store");
            Ok(Arc::new(MemoryScoreStore::new()))
        }
        Err(err) => Err(err).context("reading Firebase configuration"),
    }
}

#[cfg(not(feature = "firebase-store"))]
async fn connect_store() -> anyhow::Result<Arc<dyn ScoreStore>> {
    warn!("built without Firebase support; using in-memory store");
    Ok(Arc::new(MemoryScoreStore::new()))
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
