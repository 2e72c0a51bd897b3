mod cache;
mod db;
pub mod error;
pub mod models;
mod sessions;
pub mod settings;
pub mod stats;
pub mod timer;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde_json::{json, Value};

pub use cache::FallbackCache;
pub use db::Database;
pub use error::TrackerError;

use sessions::commands::{daily_totals, load_sessions, save_sessions, session_stats};
use settings::{SettingsStore, TrackerSettings};
use timer::{
    commands::{
        dismiss_alarm, get_timer_state, select_game, skip_metadata, start_timer, stop_timer,
        submit_metadata,
    },
    Clock, SystemClock, TimerController,
};

pub const DB_FILE_NAME: &str = "gametrack.sqlite3";
pub const CACHE_FILE_NAME: &str = "sessions-cache.json";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Clone)]
pub struct AppState {
    pub(crate) timer: TimerController,
}

impl AppState {
    pub fn new(timer: TimerController) -> Self {
        Self { timer }
    }

    /// Opens the store and cache under `data_dir` and builds the controller on `clock`.
    pub fn open(
        data_dir: &std::path::Path,
        settings: &TrackerSettings,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
        let database = Database::new(data_dir.join(DB_FILE_NAME))?;
        let cache = FallbackCache::new(data_dir.join(CACHE_FILE_NAME));
        Ok(Self::new(TimerController::new(database, cache, clock, settings)))
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions/save", post(save_sessions))
        .route("/api/sessions/load", get(load_sessions))
        .route("/api/sessions/stats", get(session_stats))
        .route("/api/sessions/daily", get(daily_totals))
        .route("/api/timer", get(get_timer_state))
        .route("/api/timer/start", post(start_timer))
        .route("/api/timer/stop", post(stop_timer))
        .route("/api/timer/metadata", post(submit_metadata))
        .route("/api/timer/skip", post(skip_metadata))
        .route("/api/timer/select", post(select_game))
        .route("/api/timer/alarm/dismiss", post(dismiss_alarm))
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("gametrack starting up...");

    let data_dir = settings::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_path = data_dir.join(SETTINGS_FILE_NAME);
    let first_run = !settings_path.exists();
    let settings_store = SettingsStore::new(settings_path)?;
    if first_run {
        // Leave an editable copy of the defaults behind.
        settings_store.update(settings_store.current())?;
        info!("Wrote default settings to {}", settings_store.path().display());
    }
    let mut settings = settings_store.current();
    settings.apply_env();

    let state = AppState::open(&data_dir, &settings, Arc::new(SystemClock))?;

    match state.timer.load_sessions().await {
        Ok(sessions) => info!("Loaded {} stored sessions", sessions.len()),
        Err(err) => warn!("Starting with an empty collection: {err}"),
    }

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("Listening on http://{}", settings.bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {err}");
            }
            info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
