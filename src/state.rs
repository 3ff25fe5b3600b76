//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - Registry of active relay sessions
//! - Slot counter enforcing the session limit

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{RelayError, Result};
use crate::relay::session::{SessionHandle, SessionSummary};

/// Main application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Active sessions by session ID
    pub sessions: DashMap<String, Arc<SessionHandle>>,

    /// Reserved session slots, always >= `sessions.len()`
    active: AtomicUsize,

    /// Shutdown flag
    pub shutdown: AtomicBool,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            active: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Whether another session would exceed the configured limit
    pub fn at_capacity(&self) -> bool {
        self.config
            .max_concurrent_sessions
            .is_some_and(|max| self.active.load(Ordering::SeqCst) >= max)
    }

    /// Register a new session, unless the limit is reached
    pub fn register_session(&self) -> Result<Arc<SessionHandle>> {
        if self.is_shutdown() {
            return Err(RelayError::ShuttingDown);
        }
        let max = self.config.max_concurrent_sessions;
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match max {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            })
            .map_err(RelayError::SessionLimit)?;

        let handle = Arc::new(SessionHandle::new());
        self.sessions
            .insert(handle.id().to_string(), Arc::clone(&handle));
        tracing::debug!(session_id = %handle.id(), active = self.sessions.len(), "Registered session");
        Ok(handle)
    }

    /// Get a session by ID
    pub fn get_session(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|r| Arc::clone(r.value()))
    }

    /// Remove a finished session
    pub fn remove_session(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let (_, handle) = self.sessions.remove(session_id)?;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Some(handle)
    }

    /// Snapshot of all active sessions
    pub fn active_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|r| r.summary()).collect();
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        sessions
    }

    /// Signal shutdown; new sessions are refused afterwards
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Removes a session from the registry when dropped, including on panic
/// or when the upgrade never completes.
pub struct SessionGuard {
    state: Arc<AppState>,
    id: String,
}

impl SessionGuard {
    pub fn new(state: Arc<AppState>, id: impl Into<String>) -> Self {
        Self {
            state,
            id: id.into(),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.state.remove_session(&self.id).is_some() {
            tracing::debug!(session_id = %self.id, "Deregistered session");
        }
    }
}
