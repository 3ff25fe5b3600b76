//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the liveness, version and debug endpoints
//! - WebSocket upgrade for the audio relay
//! - CORS and request tracing middleware

pub mod handlers;
pub mod routes;
pub mod socket;

pub use routes::create_router;
