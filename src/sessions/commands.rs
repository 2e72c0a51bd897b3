use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::{parse_json_body, TrackerError},
    models::SessionRecord,
    stats::{group_by_date_and_game, summarize},
    AppState,
};

/// Pulls the `sessions` array out of a save payload. Only the envelope is strict; each
/// record is read leniently.
fn sessions_from_payload(payload: Value) -> Result<Vec<SessionRecord>, TrackerError> {
    let Value::Object(mut envelope) = payload else {
        return Err(TrackerError::validation("request body must be a JSON object"));
    };
    let Some(Value::Array(items)) = envelope.remove("sessions") else {
        return Err(TrackerError::validation("sessions must be an array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(TrackerError::validation(format!(
                    "sessions[{index}] must be an object"
                )));
            }
            serde_json::from_value(item).map_err(|err| {
                TrackerError::validation(format!("sessions[{index}] is malformed: {err}"))
            })
        })
        .collect()
}

pub async fn save_sessions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, TrackerError> {
    let payload: Value = parse_json_body(&body)?;
    let sessions = sessions_from_payload(payload)?;
    state.timer.save_sessions(sessions).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn load_sessions(State(state): State<AppState>) -> Result<Json<Value>, TrackerError> {
    let sessions = state.timer.load_sessions().await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// Stats over the in-memory collection, which can hold completions the store has not
/// accepted yet.
pub async fn session_stats(State(state): State<AppState>) -> Result<Json<Value>, TrackerError> {
    let sessions = state.timer.sessions().await;
    let stats = summarize(&sessions, state.timer.registry());
    Ok(Json(json!({ "stats": stats })))
}

pub async fn daily_totals(State(state): State<AppState>) -> Result<Json<Value>, TrackerError> {
    let sessions = state.timer.sessions().await;
    let days = group_by_date_and_game(&sessions, state.timer.registry());
    Ok(Json(json!({ "days": days })))
}
