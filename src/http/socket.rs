//! WebSocket endpoint for the audio relay
//! GET /ws

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::handlers::HttpError;
use crate::relay::{LoggingSink, SessionCoordinator, WsConnection};
use crate::state::{AppState, SessionGuard};

/// Upgrade to a WebSocket and run one relay session on it.
///
/// The session is registered before the upgrade so the concurrency limit is
/// enforced with a plain 503 response. The registration is released when the
/// upgrade callback is dropped: after the session ends, when the upgrade
/// fails, or when the session task panics.
pub async fn audio_socket(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Result<Response, HttpError> {
    let handle = state.register_session()?;
    let coordinator = SessionCoordinator::from_config(Arc::clone(&handle), &state.config);
    let span = info_span!("session", id = %handle.id());

    let guard = SessionGuard::new(Arc::clone(&state), handle.id());
    let failed_id = handle.id().to_string();

    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!(session_id = %failed_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| {
            async move {
                let _guard = guard;
                info!("WebSocket connection accepted");
                let mut conn = WsConnection::new(socket);
                let report = coordinator.run(&mut conn, LoggingSink::default()).await;
                info!(clean = report.is_clean(), "WebSocket connection closed");
            }
            .instrument(span)
        }))
}
