use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{duration_minutes_between, new_session_id, GameId, SessionMetadata, SessionRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    AwaitingMetadata,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// One-shot daily-limit alarm. Fires at most once per running session; dismissing only
/// silences it.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlarmLatch {
    pub fired: bool,
    pub dismissed: bool,
}

impl AlarmLatch {
    pub fn is_sounding(&self) -> bool {
        self.fired && !self.dismissed
    }
}

/// Outcome of choosing a game in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "game", rename_all = "camelCase")]
pub enum GameSelection {
    /// Nothing was in progress (or the same game was picked again).
    Selected,
    /// The switch was not confirmed; the picker goes back to the in-progress game.
    Reverted(GameId),
    /// The switch was confirmed and the running session was stopped for it.
    StoppedForSwitch,
}

/// Lifecycle of the single in-progress session:
/// `Idle -> Running -> AwaitingMetadata -> Idle`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub selected_game: Option<GameId>,
    /// The record being built. Present while `Running` and `AwaitingMetadata`.
    pub session: Option<SessionRecord>,
    pub alarm: AlarmLatch,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_game(&self) -> Option<&GameId> {
        self.session.as_ref().map(|session| &session.game)
    }

    /// Returns `false` (and changes nothing) unless the timer is idle.
    pub fn start(&mut self, game: GameId, now: DateTime<Utc>) -> bool {
        if self.status != TimerStatus::Idle {
            return false;
        }

        let started_at = now.fixed_offset();
        *self = Self {
            status: TimerStatus::Running,
            selected_game: Some(game.clone()),
            session: Some(SessionRecord {
                id: new_session_id(),
                game,
                date: Some(now.date_naive()),
                start_time: Some(started_at),
                end_time: None,
                duration_minutes: Some(0),
                metadata: SessionMetadata::None,
            }),
            alarm: AlarmLatch::default(),
        };
        true
    }

    /// Returns `false` (and changes nothing) unless the timer is running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            self.status = TimerStatus::Idle;
            return false;
        };

        let ended_at = now.fixed_offset();
        session.duration_minutes = Some(
            session
                .start_time
                .map(|start| duration_minutes_between(start, ended_at))
                .unwrap_or(0),
        );
        session.end_time = Some(ended_at);
        self.status = TimerStatus::AwaitingMetadata;
        true
    }

    /// Attaches metadata read from `data` and hands back the finished record.
    pub fn submit_metadata(&mut self, data: &Value) -> Option<SessionRecord> {
        if self.status != TimerStatus::AwaitingMetadata {
            return None;
        }
        let game = self.current_game()?.clone();
        self.finish(SessionMetadata::from_value(&game, data))
    }

    pub fn skip_metadata(&mut self) -> Option<SessionRecord> {
        if self.status != TimerStatus::AwaitingMetadata {
            return None;
        }
        self.finish(SessionMetadata::None)
    }

    fn finish(&mut self, metadata: SessionMetadata) -> Option<SessionRecord> {
        let mut session = self.session.take()?;
        session.metadata = metadata;
        self.status = TimerStatus::Idle;
        self.alarm = AlarmLatch::default();
        Some(session)
    }

    pub fn select_game(
        &mut self,
        game: GameId,
        confirmed: bool,
        now: DateTime<Utc>,
    ) -> GameSelection {
        let current = match (self.status, self.current_game()) {
            (TimerStatus::Idle, _) | (_, None) => None,
            (_, Some(current)) if *current == game => None,
            (_, Some(current)) => Some(current.clone()),
        };

        let Some(current) = current else {
            self.selected_game = Some(game);
            return GameSelection::Selected;
        };

        if !confirmed {
            self.selected_game = Some(current.clone());
            return GameSelection::Reverted(current);
        }

        self.stop(now);
        self.selected_game = Some(game);
        GameSelection::StoppedForSwitch
    }

    /// Milliseconds covered by the current session so far.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let Some(start) = self.session.as_ref().and_then(|s| s.start_time) else {
            return 0;
        };
        let end = match self.status {
            TimerStatus::Idle => return 0,
            TimerStatus::Running => now.fixed_offset(),
            TimerStatus::AwaitingMetadata => self
                .session
                .as_ref()
                .and_then(|s| s.end_time)
                .unwrap_or_else(|| now.fixed_offset()),
        };
        (end - start).num_milliseconds().max(0) as u64
    }

    /// Raises the alarm the first time today's minutes for `alarm_game`, including the
    /// running session, reach `threshold_minutes`. Returns `true` only on that tick.
    pub fn check_alarm(
        &mut self,
        alarm_game: &GameId,
        recorded_today_minutes: u64,
        threshold_minutes: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status != TimerStatus::Running
            || self.alarm.fired
            || self.current_game() != Some(alarm_game)
        {
            return false;
        }

        let running_minutes = self.elapsed_ms(now) as f64 / 60_000.0;
        if recorded_today_minutes as f64 + running_minutes >= threshold_minutes as f64 {
            self.alarm.fired = true;
            return true;
        }
        false
    }

    pub fn dismiss_alarm(&mut self) {
        if self.alarm.fired {
            self.alarm.dismissed = true;
        }
    }
}
