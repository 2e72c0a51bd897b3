use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    cache::FallbackCache,
    db::Database,
    error::TrackerError,
    models::{GameId, GameRegistry, SessionRecord},
    settings::{AlarmSettings, TrackerSettings},
    stats::minutes_for_game_on,
};

use super::{
    clock::Clock,
    state::{GameSelection, TimerState, TimerStatus},
};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub elapsed_ms: u64,
    /// Minutes played today on the current (or selected) game, running session included.
    pub today_minutes: u64,
    pub alarm_sounding: bool,
}

/// The timer plus the session collection it appends to.
#[derive(Default)]
struct TrackerState {
    timer: TimerState,
    sessions: Vec<SessionRecord>,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Owns the in-progress timer and the in-memory collection, and keeps the session store
/// and fallback cache in step with it.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TrackerState>>,
    db: Database,
    cache: FallbackCache,
    clock: Arc<dyn Clock>,
    registry: GameRegistry,
    alarm: AlarmSettings,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(
        db: Database,
        cache: FallbackCache,
        clock: Arc<dyn Clock>,
        settings: &TrackerSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState::default())),
            db,
            cache,
            clock,
            registry: settings.registry(),
            alarm: settings.alarm.clone(),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: settings.tick_interval(),
        }
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    pub async fn sessions(&self) -> Vec<SessionRecord> {
        self.state.lock().await.sessions.clone()
    }

    /// Loads the stored collection and replaces the in-memory one with it. Falls back to
    /// the local cache when the store cannot be read.
    pub async fn load_sessions(&self) -> Result<Vec<SessionRecord>, TrackerError> {
        let sessions = match self.db.load_sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!("Session store load failed: {err:#}; trying fallback cache");
                match self.cache.read() {
                    Ok(Some(cached)) => {
                        info!("Serving {} sessions from fallback cache", cached.len());
                        cached
                    }
                    Ok(None) => return Err(TrackerError::Persistence(err)),
                    Err(cache_err) => {
                        warn!("Fallback cache unreadable: {cache_err:#}");
                        return Err(TrackerError::Persistence(err));
                    }
                }
            }
        };

        self.state.lock().await.sessions = sessions.clone();
        Ok(sessions)
    }

    /// Replaces the stored collection, then the in-memory collection and the cache.
    /// Rejects a collection that repeats a session id.
    pub async fn save_sessions(&self, sessions: Vec<SessionRecord>) -> Result<(), TrackerError> {
        let mut seen = HashSet::with_capacity(sessions.len());
        if let Some(duplicate) = sessions.iter().find(|s| !seen.insert(s.id.as_str())) {
            return Err(TrackerError::validation(format!(
                "duplicate session id '{}'",
                duplicate.id
            )));
        }

        self.db.replace_sessions(&sessions).await?;
        self.mirror(&sessions);
        info!("Saved {} sessions", sessions.len());
        self.state.lock().await.sessions = sessions;
        Ok(())
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let guard = self.state.lock().await;
        self.build_snapshot(&guard, self.clock.now())
    }

    /// Starts timing `game`. Already running (or awaiting metadata) is a no-op.
    pub async fn start_timer(&self, game: GameId) -> Result<TimerSnapshot, TrackerError> {
        if !self.registry.contains(&game) {
            return Err(TrackerError::validation(format!("unknown game '{game}'")));
        }

        let mut guard = self.state.lock().await;
        let now = self.clock.now();
        if guard.timer.start(game.clone(), now) {
            info!("Timer started for {game}");
            // Registered before the state lock drops so a racing stop always finds it.
            self.spawn_ticker().await;
        }
        Ok(self.build_snapshot(&guard, now))
    }

    /// Stops the running timer; the session then waits for metadata. No-op unless running.
    pub async fn stop_timer(&self) -> TimerSnapshot {
        let (ticker, snapshot) = {
            let mut guard = self.state.lock().await;
            let now = self.clock.now();
            let ticker = if guard.timer.stop(now) {
                self.take_ticker().await
            } else {
                None
            };
            (ticker, self.build_snapshot(&guard, now))
        };

        if let Some(ticker) = ticker {
            finish_ticker(ticker).await;
            info!("Timer stopped after {} ms", snapshot.elapsed_ms);
        }
        snapshot
    }

    pub async fn submit_metadata(
        &self,
        data: &Value,
    ) -> Result<Option<SessionRecord>, TrackerError> {
        let completed = {
            let mut guard = self.state.lock().await;
            guard.timer.submit_metadata(data)
        };
        self.complete(completed).await
    }

    pub async fn skip_metadata(&self) -> Result<Option<SessionRecord>, TrackerError> {
        let completed = {
            let mut guard = self.state.lock().await;
            guard.timer.skip_metadata()
        };
        self.complete(completed).await
    }

    /// Appends a finished record and persists the whole collection. The record stays in
    /// memory and in the cache even when the store write fails.
    async fn complete(
        &self,
        completed: Option<SessionRecord>,
    ) -> Result<Option<SessionRecord>, TrackerError> {
        let Some(record) = completed else {
            return Ok(None);
        };

        let sessions = {
            let mut guard = self.state.lock().await;
            guard.sessions.push(record.clone());
            guard.sessions.clone()
        };
        info!(
            "Session {} completed: {} min of {}",
            record.id,
            record.minutes(),
            record.game
        );

        self.mirror(&sessions);
        self.db.replace_sessions(&sessions).await?;
        Ok(Some(record))
    }

    pub async fn select_game(
        &self,
        game: GameId,
        confirmed: bool,
    ) -> Result<(GameSelection, TimerSnapshot), TrackerError> {
        if !self.registry.contains(&game) {
            return Err(TrackerError::validation(format!("unknown game '{game}'")));
        }

        let (selection, ticker, snapshot) = {
            let mut guard = self.state.lock().await;
            let now = self.clock.now();
            let selection = guard.timer.select_game(game, confirmed, now);
            let ticker = if selection == GameSelection::StoppedForSwitch {
                self.take_ticker().await
            } else {
                None
            };
            (selection, ticker, self.build_snapshot(&guard, now))
        };

        if let Some(ticker) = ticker {
            finish_ticker(ticker).await;
        }
        Ok((selection, snapshot))
    }

    pub async fn dismiss_alarm(&self) -> TimerSnapshot {
        let mut guard = self.state.lock().await;
        guard.timer.dismiss_alarm();
        self.build_snapshot(&guard, self.clock.now())
    }

    /// One ticker step. Returns `false` once the timer is no longer running.
    pub(crate) async fn tick(&self) -> bool {
        tick_once(&self.state, self.clock.as_ref(), &self.alarm).await
    }

    fn mirror(&self, sessions: &[SessionRecord]) {
        if let Err(err) = self.cache.write(sessions) {
            warn!("Failed to update fallback cache: {err:#}");
        }
    }

    fn build_snapshot(&self, tracker: &TrackerState, now: DateTime<Utc>) -> TimerSnapshot {
        let timer = &tracker.timer;
        let elapsed_ms = timer.elapsed_ms(now);
        let game = timer.current_game().or(timer.selected_game.as_ref());

        let today_minutes = game
            .map(|game| {
                let recorded = minutes_for_game_on(&tracker.sessions, game, now.date_naive());
                let running = match timer.status {
                    TimerStatus::Idle => 0,
                    _ => elapsed_ms / 60_000,
                };
                recorded.saturating_add(running)
            })
            .unwrap_or(0);

        TimerSnapshot {
            state: timer.clone(),
            elapsed_ms,
            today_minutes,
            alarm_sounding: timer.alarm.is_sounding(),
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !controller.tick().await {
                            break;
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    /// Detaches and cancels the ticker. Callers hold the state lock, so the ticker task
    /// is only awaited after that lock is released.
    async fn take_ticker(&self) -> Option<Ticker> {
        let ticker = self.ticker.lock().await.take()?;
        ticker.cancel.cancel();
        Some(ticker)
    }

    #[cfg(test)]
    pub(crate) async fn ticker_active(&self) -> bool {
        self.ticker.lock().await.is_some()
    }
}

async fn finish_ticker(ticker: Ticker) {
    if let Err(err) = ticker.handle.await {
        if !err.is_cancelled() {
            warn!("Timer ticker ended abnormally: {err}");
        }
    }
}

async fn tick_once(state: &Mutex<TrackerState>, clock: &dyn Clock, alarm: &AlarmSettings) -> bool {
    let mut guard = state.lock().await;
    if guard.timer.status != TimerStatus::Running {
        return false;
    }

    let now = clock.now();
    let recorded = minutes_for_game_on(&guard.sessions, &alarm.game, now.date_naive());
    if guard
        .timer
        .check_alarm(&alarm.game, recorded, alarm.threshold_minutes, now)
    {
        warn!(
            "Daily limit reached: {} minutes of {} today",
            alarm.threshold_minutes, alarm.game
        );
    }
    true
}
