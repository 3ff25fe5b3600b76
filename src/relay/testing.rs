//! Test doubles for the relay

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

use super::connection::{AudioConnection, CloseStatus, Received};
use super::sink::PcmSink;
use crate::error::{RelayError, Result};

/// Connection that replays a fixed script of receive results
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    script: VecDeque<Result<Received>>,
    pub recv_calls: usize,
    pub closed: Vec<CloseStatus>,
}

impl ScriptedConnection {
    pub fn new(script: Vec<Result<Received>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }

    /// `chunks` followed by a clean disconnect
    pub fn chunks_then_disconnect(chunks: &[Vec<u8>]) -> Self {
        let mut script: Vec<Result<Received>> = chunks
            .iter()
            .map(|c| Ok(Received::Chunk(Bytes::from(c.clone()))))
            .collect();
        script.push(Ok(Received::Disconnected));
        Self::new(script)
    }
}

impl AudioConnection for ScriptedConnection {
    async fn recv(&mut self) -> Result<Received> {
        self.recv_calls += 1;
        self.script
            .pop_front()
            .unwrap_or(Ok(Received::Disconnected))
    }

    async fn close(&mut self, status: CloseStatus) {
        self.closed.push(status);
    }
}

#[derive(Debug, Default)]
pub struct WriterLog {
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
    pub shutdowns: usize,
}

/// Writer that records every call, optionally failing all writes
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter {
    pub log: Arc<Mutex<WriterLog>>,
    fail_with: Option<io::ErrorKind>,
}

impl RecordingWriter {
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Default::default()
        }
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(kind) = self.fail_with {
            return Poll::Ready(Err(io::Error::from(kind)));
        }
        self.log.lock().writes.push(buf.to_vec());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.lock().flushes += 1;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.lock().shutdowns += 1;
        Poll::Ready(Ok(()))
    }
}

/// Sink that keeps every chunk, optionally failing after `fail_after` chunks
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub chunks: Vec<Bytes>,
    pub fail_after: Option<usize>,
}

impl CollectingSink {
    pub fn concat(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

impl PcmSink for CollectingSink {
    async fn consume(&mut self, chunk: Bytes) -> Result<()> {
        if self.fail_after == Some(self.chunks.len()) {
            return Err(RelayError::Consumer("recognizer rejected chunk".into()));
        }
        self.chunks.push(chunk);
        Ok(())
    }
}
