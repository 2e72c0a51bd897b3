use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use gametrack_lib::{
    router,
    settings::TrackerSettings,
    timer::{Clock, ManualClock},
    AppState,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base: String,
    clock: ManualClock,
    _dir: tempfile::TempDir,
}

async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().expect("temp dir");
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let settings = TrackerSettings {
        tick_interval_ms: 3_600_000,
        ..TrackerSettings::default()
    };
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let state = AppState::open(dir.path(), &settings, shared_clock).expect("open state");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });

    TestServer {
        base: format!("http://{addr}"),
        clock,
        _dir: dir,
    }
}

impl TestServer {
    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = reqwest::get(format!("{}{path}", self.base))
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}{path}", self.base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }
}

#[tokio::test]
async fn save_load_and_stats() {
    let server = spawn_server().await;

    let (status, body) = server
        .post(
            "/api/sessions/save",
            json!({"sessions": [
                {"id": "v1", "game": "valorant", "date": "2024-01-01",
                 "startTime": "2024-01-01T18:00:00.000Z", "endTime": "2024-01-01T18:30:00.000Z",
                 "durationMinutes": 30, "metadata": {"matchTypes": {"competitive": 2}}},
                {"id": "k1", "game": "kovaaks", "date": "2024-01-01T20:00:00.000Z",
                 "startTime": "2024-01-01T20:00:00.000Z", "endTime": "2024-01-01T20:45:00.000Z",
                 "durationMinutes": 45, "metadata": {"aimType": "static-clicking"}}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = server.get("/api/sessions/load").await;
    assert_eq!(status, StatusCode::OK);
    let sessions = body["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[1]["date"], "2024-01-01");
    assert_eq!(sessions[1]["metadata"], json!({"aimType": "static-clicking"}));
    assert_eq!(sessions[0]["metadata"], json!({"matchTypes": {"competitive": 2}}));

    let (status, body) = server.get("/api/sessions/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["stats"],
        json!({
            "totalSessions": 2,
            "totalTimeMinutes": 75,
            "avgSessionMinutes": 37.5,
            "gameBreakdown": {"valorant": 30, "kovaaks": 45},
            "matchTypeBreakdown": {"competitive": 2},
            "aimTypeBreakdown": {"static-clicking": 45}
        })
    );

    let (status, body) = server.get("/api/sessions/daily").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["days"],
        json!([{"date": "2024-01-01", "minutes": {"kovaaks": 45, "valorant": 30}}])
    );
}

#[tokio::test]
async fn empty_store_reports_zero_average() {
    let server = spawn_server().await;
    let (status, body) = server.get("/api/sessions/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalSessions"], 0);
    assert_eq!(body["stats"]["avgSessionMinutes"], 0.0);
    assert_eq!(body["stats"]["gameBreakdown"], json!({"kovaaks": 0, "valorant": 0}));
    assert_eq!(body["stats"]["matchTypeBreakdown"], json!({}));
}

#[tokio::test]
async fn malformed_save_payloads_are_rejected() {
    let server = spawn_server().await;

    let (status, body) = server
        .post("/api/sessions/save", json!({"sessions": "all of them"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "sessions must be an array");

    let (status, body) = server.post_raw("/api/sessions/save", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("malformed request body"));

    let (status, body) = server
        .post(
            "/api/sessions/save",
            json!({"sessions": [
                {"id": "dup", "game": "valorant", "date": "2024-01-01", "durationMinutes": 5},
                {"id": "dup", "game": "kovaaks", "date": "2024-01-01", "durationMinutes": 9}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate session id 'dup'");

    let (_, body) = server.get("/api/sessions/load").await;
    assert_eq!(body["sessions"], json!([]));
}

#[tokio::test]
async fn timer_flow_over_http() {
    let server = spawn_server().await;

    let (status, body) = server
        .post("/api/timer/start", json!({"game": "kovaaks"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["state"]["status"], "running");

    server.clock.advance(Duration::minutes(25));

    let (_, body) = server
        .post("/api/timer/select", json!({"game": "valorant"}))
        .await;
    assert_eq!(body["selection"], json!({"outcome": "reverted", "game": "kovaaks"}));
    assert_eq!(body["timer"]["state"]["status"], "running");

    let (_, body) = server.post("/api/timer/stop", json!({})).await;
    assert_eq!(body["timer"]["state"]["status"], "awaitingMetadata");
    assert_eq!(body["timer"]["state"]["session"]["durationMinutes"], 25);

    let (status, body) = server
        .post("/api/timer/metadata", json!({"metadata": {"aimType": "tracking"}}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["state"]["status"], "idle");
    assert_eq!(body["session"]["metadata"], json!({"aimType": "tracking"}));
    assert_eq!(body["session"]["date"], "2024-01-01");

    let (_, body) = server.get("/api/sessions/stats").await;
    assert_eq!(body["stats"]["aimTypeBreakdown"], json!({"tracking": 25}));
    assert_eq!(body["stats"]["gameBreakdown"]["kovaaks"], 25);
}

#[tokio::test]
async fn unknown_game_is_a_bad_request() {
    let server = spawn_server().await;
    let (status, body) = server
        .post("/api/timer/start", json!({"game": "minesweeper"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown game 'minesweeper'");

    let (_, body) = server.get("/api/timer").await;
    assert_eq!(body["timer"]["state"]["status"], "idle");
}

#[tokio::test]
async fn skip_without_session_is_noop() {
    let server = spawn_server().await;
    let (status, body) = server.post("/api/timer/skip", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"], Value::Null);

    let (status, body) = server.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
