//! Downstream PCM consumers
//!
//! A sink receives PCM chunks one at a time, in the order the transcoder
//! produced them. The drain awaits each `consume` before reading again, so
//! a slow sink slows the drain and, through the pipe, the transcoder.

use bytes::Bytes;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Consumer of transcoded PCM audio
pub trait PcmSink: Send {
    /// Accept one chunk. Errors should use [`RelayError::Consumer`].
    fn consume(&mut self, chunk: Bytes) -> impl Future<Output = Result<()>> + Send;
}

impl<S: PcmSink> PcmSink for &mut S {
    fn consume(&mut self, chunk: Bytes) -> impl Future<Output = Result<()>> + Send {
        (**self).consume(chunk)
    }
}

/// Logs chunk sizes and drops the audio.
///
/// Stands in for a speech recognition backend.
#[derive(Debug, Default)]
pub struct LoggingSink {
    chunks: u64,
    bytes: u64,
}

impl LoggingSink {
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl PcmSink for LoggingSink {
    async fn consume(&mut self, chunk: Bytes) -> Result<()> {
        self.chunks += 1;
        self.bytes += chunk.len() as u64;
        debug!(
            size = chunk.len(),
            total = self.bytes,
            "Received PCM chunk for recognition"
        );
        Ok(())
    }
}

/// Hands chunks to a bounded channel.
///
/// A full channel blocks the drain; a dropped receiver fails the session.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiver
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl PcmSink for ChannelSink {
    async fn consume(&mut self, chunk: Bytes) -> Result<()> {
        self.tx
            .send(chunk)
            .await
            .map_err(|_| RelayError::Consumer("PCM receiver dropped".to_string()))
    }
}
