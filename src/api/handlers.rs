use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NavigationRequest, SearchResults, SourceKind, SyncState};

use super::AppState;

/// Longest query text accepted from clients
const MAX_QUERY_CHARS: usize = 256;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub state: SyncState,
    pub catalog_size: usize,
    pub synced_at: Option<DateTime<Utc>>,
    pub query_pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQueryRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitQueryResponse {
    pub accepted: bool,
    pub sequence: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: i64,
    pub kind: SourceKind,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Sync state and catalog size of the hosted session
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = &state.inner.session;
    let sync_state = session.state();
    let catalog = session.catalog();

    Json(StatusResponse {
        session_id: session.id(),
        state: sync_state,
        catalog_size: catalog.len(),
        synced_at: (sync_state == SyncState::Ready).then_some(catalog.synced_at),
        query_pending: session.has_pending_query(),
    })
}

/// Re-runs the full catalog sync in the background
pub async fn resync(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let inner = &state.inner;
    inner.session.resync(inner.credentials.clone()).await;
    (
        StatusCode::ACCEPTED,
        Json(json!({ "state": inner.session.state() })),
    )
}

/// Debounced query submission, one call per keystroke
pub async fn submit_query(
    State(state): State<AppState>,
    Json(request): Json<SubmitQueryRequest>,
) -> AppResult<(StatusCode, Json<SubmitQueryResponse>)> {
    validate_query(&request.text)?;

    let sequence = state.inner.session.submit(&request.text);
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitQueryResponse {
            accepted: sequence.is_some(),
            sequence,
        }),
    ))
}

/// Latest delivered result set
pub async fn latest_results(State(state): State<AppState>) -> Response {
    match state.inner.latest_results() {
        Some(results) => Json(results).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Immediate search against the current catalog
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResults>> {
    validate_query(&params.q)?;
    let results = state.inner.session.query(&params.q)?;

    tracing::info!(
        query = %params.q,
        results = results.items.len(),
        status = ?results.status,
        "Search completed"
    );

    Ok(Json(results))
}

/// Resolves a selected item into a navigation request
pub async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> AppResult<Json<NavigationRequest>> {
    let navigation = state.inner.session.select(request.id, request.kind)?;
    Ok(Json(navigation))
}

fn validate_query(text: &str) -> AppResult<()> {
    let length = text.chars().count();
    if length > MAX_QUERY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "query is {} characters long, the limit is {}",
            length, MAX_QUERY_CHARS
        )));
    }
    Ok(())
}
