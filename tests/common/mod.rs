//! Fake catalog panel for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

/// Canned listings served from `/player_api.php`
#[derive(Default)]
pub struct FakePanel {
    pub vod: Value,
    pub series: Value,
    pub live: Value,
    /// Actions answered with HTTP 500
    pub failing: Vec<&'static str>,
    pub hits: AtomicUsize,
}

impl FakePanel {
    pub fn matrix() -> Self {
        Self {
            vod: json!([
                { "stream_id": 1, "name": "Matrix", "rating": "8.7", "stream_icon": "http://img.test/matrix.jpg" },
                { "stream_id": 2, "name": null, "rating": 5 }
            ]),
            series: json!([
                { "series_id": "2", "name": "Matrix Reloaded", "rating": "7.2", "cover": "http://img.test/reloaded.jpg" }
            ]),
            live: json!([
                { "stream_id": 1, "name": "News 24", "stream_icon": "http://img.test/news.png" },
                { "stream_id": 3 }
            ]),
            ..Self::default()
        }
    }

    pub fn failing(mut self, actions: &[&'static str]) -> Self {
        self.failing = actions.to_vec();
        self
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn player_api(
    State(panel): State<Arc<FakePanel>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    panel.hits.fetch_add(1, Ordering::SeqCst);

    let authorized = params.get("username").map(String::as_str) == Some(USERNAME)
        && params.get("password").map(String::as_str) == Some(PASSWORD);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }

    let action = params.get("action").map(String::as_str).unwrap_or_default();
    if panel.failing.contains(&action) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    match action {
        "get_vod_streams" => Json(panel.vod.clone()).into_response(),
        "get_series" => Json(panel.series.clone()).into_response(),
        "get_live_streams" if params.get("category_id").map(String::as_str) == Some("0") => {
            Json(panel.live.clone()).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "unknown action").into_response(),
    }
}

/// Serves `panel` on an ephemeral local port and returns its base URL
pub async fn spawn_panel(panel: Arc<FakePanel>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/player_api.php", get(player_api))
        .with_state(panel);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
