use chrono::{DateTime, FixedOffset, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use super::{
    dates::{normalize_date, parse_timestamp},
    game::GameId,
    metadata::SessionMetadata,
};

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whole minutes between two instants, rounding half away from zero. Clock skew that
/// puts `end` before `start` yields zero.
pub fn duration_minutes_between(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> u64 {
    let elapsed_ms = (end - start).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0;
    }
    (elapsed_ms as f64 / 60_000.0).round() as u64
}

/// One timed play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireSession")]
pub struct SessionRecord {
    pub id: String,
    pub game: GameId,
    /// Canonical calendar date. `None` only when neither the date nor the start time
    /// could be read.
    pub date: Option<NaiveDate>,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub duration_minutes: Option<u64>,
    #[serde(serialize_with = "serialize_metadata")]
    pub metadata: SessionMetadata,
}

impl SessionRecord {
    /// Minutes this record contributes to aggregates; missing counts as zero.
    pub fn minutes(&self) -> u64 {
        self.duration_minutes.unwrap_or(0)
    }

    pub fn is_in_progress(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }
}

fn serialize_metadata<S: Serializer>(meta: &SessionMetadata, serializer: S) -> Result<S::Ok, S::Error> {
    meta.to_value().serialize(serializer)
}

/// Loose inbound shape. Every field that can be malformed is read leniently so one bad
/// record never rejects a whole payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSession {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    game: Option<String>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    start_time: Option<Value>,
    #[serde(default)]
    end_time: Option<Value>,
    #[serde(default)]
    duration_minutes: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl From<WireSession> for SessionRecord {
    fn from(wire: WireSession) -> Self {
        let id = match wire.id {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(Value::Number(n)) => n.to_string(),
            _ => new_session_id(),
        };
        let game = GameId::new(wire.game.unwrap_or_default());
        let start_time = wire.start_time.as_ref().and_then(|v| timestamp_from_value(v, "startTime"));
        let end_time = wire.end_time.as_ref().and_then(|v| timestamp_from_value(v, "endTime"));
        let date = wire
            .date
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| match normalize_date(raw) {
                Ok(date) => Some(date),
                Err(err) => {
                    debug!("session {id}: {err}; falling back to start time");
                    None
                }
            })
            .or_else(|| start_time.map(|ts| ts.date_naive()));
        let duration_minutes = wire.duration_minutes.as_ref().and_then(minutes_from_value);
        let metadata = match &wire.metadata {
            // Some writers stored the bag pre-encoded as a JSON string.
            Some(Value::String(raw)) => SessionMetadata::from_stored(&game, Some(raw)),
            Some(value) => SessionMetadata::from_value(&game, value),
            None => SessionMetadata::None,
        };

        SessionRecord {
            id,
            game,
            date,
            start_time,
            end_time,
            duration_minutes,
            metadata,
        }
    }
}

fn timestamp_from_value(value: &Value, field: &str) -> Option<DateTime<FixedOffset>> {
    let raw = value.as_str()?;
    match parse_timestamp(raw) {
        Ok(ts) => Some(ts),
        Err(err) => {
            debug!("{field}: {err}");
            None
        }
    }
}

fn minutes_from_value(value: &Value) -> Option<u64> {
    if let Some(minutes) = value.as_u64() {
        return Some(minutes);
    }
    let minutes = value.as_f64()?;
    if !minutes.is_finite() {
        return None;
    }
    Some(minutes.max(0.0).round() as u64)
}
