//! Client connection abstraction
//!
//! The relay only needs two things from the transport: receive the next
//! binary message (or learn that the client went away) and close with a
//! status. [`WsConnection`] provides both on top of an axum WebSocket.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use bytes::Bytes;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// Largest close reason that fits in a WebSocket close frame
const MAX_CLOSE_REASON: usize = 123;

/// Result of one receive on the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One binary message
    Chunk(Bytes),
    /// The client closed the connection
    Disconnected,
}

/// Status sent to the client when the session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseStatus {
    pub code: u16,
    pub reason: String,
}

impl CloseStatus {
    pub fn normal() -> Self {
        Self {
            code: close_code::NORMAL,
            reason: String::new(),
        }
    }

    pub fn server_error(reason: impl Into<String>) -> Self {
        Self {
            code: close_code::ERROR,
            reason: reason.into(),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.code == close_code::NORMAL
    }
}

/// Message-oriented client connection
pub trait AudioConnection: Send {
    /// Wait for the next binary message.
    fn recv(&mut self) -> impl Future<Output = Result<Received>> + Send;

    /// Close the connection with the given status.
    fn close(&mut self, status: CloseStatus) -> impl Future<Output = ()> + Send;
}

/// [`AudioConnection`] over an upgraded axum WebSocket
pub struct WsConnection {
    socket: WebSocket,
}

impl WsConnection {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl AudioConnection for WsConnection {
    async fn recv(&mut self) -> Result<Received> {
        loop {
            match self.socket.recv().await {
                None => return Ok(Received::Disconnected),
                Some(Ok(Message::Binary(data))) => return Ok(Received::Chunk(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(
                        code = ?frame.as_ref().map(|f| f.code),
                        "Client sent close frame"
                    );
                    return Ok(Received::Disconnected);
                }
                Some(Ok(Message::Text(text))) => {
                    warn!(len = text.len(), "Ignoring text message on audio socket");
                }
                // Answered by the transport
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Err(e)) => return Err(RelayError::Transport(e.to_string())),
            }
        }
    }

    async fn close(&mut self, status: CloseStatus) {
        let frame = CloseFrame {
            code: status.code,
            reason: truncate_reason(&status.reason).to_owned().into(),
        };
        if let Err(e) = self.socket.send(Message::Close(Some(frame))).await {
            debug!(error = %e, "Close frame not delivered");
        }
    }
}

/// Cut a close reason to the frame limit without splitting a character.
pub fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}
