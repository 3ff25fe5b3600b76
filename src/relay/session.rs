//! Session coordinator
//!
//! Owns one transcoder per connection and runs the inbound relay and the
//! outbound drain side by side until both reach their natural end. Neither
//! direction cancels the other: a failed client still lets the transcoder
//! flush its output, and a failed drain still lets the client finish.
//!
//! State machine:
//!
//! ```text
//! Starting -> Streaming -> Draining -> Closed
//!     \            \            \
//!      +------------+------------+--> Errored
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::connection::{AudioConnection, CloseStatus};
use super::input::relay_inbound;
use super::output::{forward_output, PcmDrain};
use super::sink::PcmSink;
use super::stats::{SessionStats, StatsSnapshot};
use crate::config::{ServerConfig, TranscoderConfig};
use crate::error::RelayError;
use crate::transcoder::{ExitStatus, TranscoderProcess};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Streaming,
    Draining,
    Closed,
    Errored,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Errored)
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Starting, Streaming) | (Streaming, Draining) | (Draining, Closed) => true,
            (from, Errored) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Shared, observable part of a session
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    started_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    stats: SessionStats,
}

/// Serializable view of a [`SessionHandle`]
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: SessionState,
    pub started_at: String,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            state: Mutex::new(SessionState::Starting),
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            state: self.state(),
            started_at: self.started_at.to_rfc3339(),
            stats: self.stats.snapshot(),
        }
    }

    /// Move to `next` if the state machine allows it.
    fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            warn!(from = ?*state, to = ?next, "Ignoring invalid session transition");
            return false;
        }
        debug!(from = ?*state, to = ?next, "Session state change");
        *state = next;
        true
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Final outcome of one session
#[derive(Debug)]
pub struct SessionReport {
    pub id: String,
    pub state: SessionState,
    pub error: Option<RelayError>,
    pub exit: Option<ExitStatus>,
    pub stats: StatsSnapshot,
}

impl SessionReport {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs one session from transcoder start to connection close
#[derive(Debug)]
pub struct SessionCoordinator {
    handle: Arc<SessionHandle>,
    transcoder: TranscoderConfig,
    read_chunk_size: usize,
}

impl SessionCoordinator {
    pub fn new(handle: Arc<SessionHandle>, transcoder: TranscoderConfig, read_chunk_size: usize) -> Self {
        Self {
            handle,
            transcoder,
            read_chunk_size,
        }
    }

    pub fn from_config(handle: Arc<SessionHandle>, config: &ServerConfig) -> Self {
        Self::new(
            handle,
            config.transcoder.clone(),
            config.relay.read_chunk_size,
        )
    }

    /// Drive the session to completion and close `conn` with the outcome.
    pub async fn run<C, S>(&self, conn: &mut C, mut sink: S) -> SessionReport
    where
        C: AudioConnection,
        S: PcmSink,
    {
        info!("Session started");

        let process = match TranscoderProcess::start(&self.transcoder) {
            Ok(process) => process,
            Err(e) => {
                error!(error = %e, "Transcoder unavailable");
                self.handle.transition(SessionState::Errored);
                conn.close(CloseStatus::server_error(e.to_string())).await;
                return self.report(Some(e), None);
            }
        };
        let (input, output, waiter) = process.into_parts();
        self.handle.transition(SessionState::Streaming);

        let stats = &self.handle.stats;
        let drain = PcmDrain::new(output, self.read_chunk_size);
        let (inbound, outbound) = tokio::join!(
            relay_inbound(conn, input, stats),
            forward_output(drain, &mut sink, stats)
        );

        self.handle.transition(SessionState::Draining);
        let (exit, wait_error) = match waiter.wait().await {
            Ok(status) => (Some(status), None),
            Err(e) => (None, Some(e)),
        };
        if let Some(status) = exit.filter(|s| !s.success()) {
            warn!(code = ?status.code, "Transcoder exited unsuccessfully");
        }

        let error = inbound.err().or(outbound.err()).or(wait_error);
        match &error {
            None => {
                self.handle.transition(SessionState::Closed);
                conn.close(CloseStatus::normal()).await;
            }
            Some(e) => {
                self.handle.transition(SessionState::Errored);
                conn.close(CloseStatus::server_error(e.to_string())).await;
            }
        }

        let report = self.report(error, exit);
        info!(
            state = ?report.state,
            bytes_in = report.stats.bytes_in,
            bytes_out = report.stats.bytes_out,
            "Session closed"
        );
        report
    }

    fn report(&self, error: Option<RelayError>, exit: Option<ExitStatus>) -> SessionReport {
        SessionReport {
            id: self.handle.id.clone(),
            state: self.handle.state(),
            error,
            exit,
            stats: self.handle.stats.snapshot(),
        }
    }
}
