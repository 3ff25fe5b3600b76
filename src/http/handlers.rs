//! HTTP request handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::RelayError;
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::SessionLimit(_) | RelayError::ShuttingDown => {
                HttpError::Unavailable(err.to_string())
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

/// Root endpoint
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "The Architect Backend is running."
    }))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("pcm-relay v", env!("CARGO_PKG_VERSION"))
}

/// Debug endpoint - active sessions
pub async fn active_sessions(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let sessions = state.active_sessions();

    Json(serde_json::json!({
        "count": sessions.len(),
        "limit": state.config.max_concurrent_sessions,
        "sessions": sessions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }

    #[tokio::test]
    async fn test_version_check() {
        assert!(version_check().await.starts_with("pcm-relay v"));
    }

    #[test]
    fn test_session_limit_maps_to_503() {
        let response = HttpError::from(RelayError::SessionLimit(4)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = HttpError::from(RelayError::Config("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
