//! Streaming relay module
//!
//! This module moves audio through the transcoder for one connection:
//! - Connection abstraction and the axum WebSocket adapter
//! - Inbound relay (connection -> transcoder stdin)
//! - Outbound drain (transcoder stdout -> PCM chunks)
//! - PCM sinks for the downstream consumer
//! - Session coordinator joining both directions into one outcome

pub mod connection;
pub mod input;
pub mod output;
pub mod session;
pub mod sink;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{AudioConnection, CloseStatus, Received, WsConnection};
pub use input::relay_inbound;
pub use output::{forward_output, PcmDrain, DEFAULT_CHUNK_SIZE};
pub use session::{SessionCoordinator, SessionHandle, SessionReport, SessionState};
pub use sink::{ChannelSink, LoggingSink, PcmSink};
pub use stats::{SessionStats, StatsSnapshot};
