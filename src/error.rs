use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{SourceKind, SyncState};

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{kind} source fetch failed: {message}")]
    SourceFetch { kind: SourceKind, message: String },

    #[error("Catalog credentials are missing")]
    MissingCredentials,

    #[error("Catalog orchestration failed: {0}")]
    Orchestration(String),

    #[error("Catalog sync was cancelled")]
    Cancelled,

    #[error("Catalog is not ready (state: {0})")]
    NotReady(SyncState),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Errors that flip the sync gate to `Failed`
    pub fn is_orchestration(&self) -> bool {
        matches!(self, AppError::MissingCredentials | AppError::Orchestration(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotReady(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::HttpClient(_) | AppError::SourceFetch { .. } => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::MissingCredentials
            | AppError::Orchestration(_)
            | AppError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
