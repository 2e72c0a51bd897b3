use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{parse_json_body, TrackerError},
    models::{GameId, SessionRecord},
    timer::{TimerController, TimerSnapshot},
    AppState,
};

fn controller_from_state(state: &AppState) -> TimerController {
    state.timer.clone()
}

#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    pub game: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectGameRequest {
    pub game: String,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    #[serde(default)]
    pub metadata: Value,
}

fn timer_body(snapshot: &TimerSnapshot) -> Json<Value> {
    Json(json!({ "timer": snapshot }))
}

fn completion_body(snapshot: &TimerSnapshot, session: Option<SessionRecord>) -> Json<Value> {
    Json(json!({ "timer": snapshot, "session": session }))
}

pub async fn get_timer_state(State(state): State<AppState>) -> Json<Value> {
    let controller = controller_from_state(&state);
    timer_body(&controller.get_snapshot().await)
}

pub async fn start_timer(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, TrackerError> {
    let request: StartTimerRequest = parse_json_body(&body)?;
    let controller = controller_from_state(&state);
    let snapshot = controller.start_timer(GameId::new(request.game)).await?;
    Ok(timer_body(&snapshot))
}

pub async fn stop_timer(State(state): State<AppState>) -> Json<Value> {
    let controller = controller_from_state(&state);
    timer_body(&controller.stop_timer().await)
}

pub async fn submit_metadata(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, TrackerError> {
    let request: MetadataRequest = parse_json_body(&body)?;
    let controller = controller_from_state(&state);
    let session = controller.submit_metadata(&request.metadata).await?;
    Ok(completion_body(&controller.get_snapshot().await, session))
}

pub async fn skip_metadata(State(state): State<AppState>) -> Result<Json<Value>, TrackerError> {
    let controller = controller_from_state(&state);
    let session = controller.skip_metadata().await?;
    Ok(completion_body(&controller.get_snapshot().await, session))
}

pub async fn select_game(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, TrackerError> {
    let request: SelectGameRequest = parse_json_body(&body)?;
    let controller = controller_from_state(&state);
    let (selection, snapshot) = controller
        .select_game(GameId::new(request.game), request.confirmed)
        .await?;
    Ok(Json(json!({ "timer": snapshot, "selection": selection })))
}

pub async fn dismiss_alarm(State(state): State<AppState>) -> Json<Value> {
    let controller = controller_from_state(&state);
    timer_body(&controller.dismiss_alarm().await)
}
