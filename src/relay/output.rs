//! Outbound drain: transcoder stdout -> PCM chunks

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use super::sink::PcmSink;
use super::stats::SessionStats;
use crate::error::{RelayError, Result};

/// Default maximum PCM chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Reads the transcoder output in chunks of at most `max_chunk` bytes.
///
/// The drain ends at the first zero-length read or I/O error and never
/// yields again afterwards. The reader is dropped as soon as it ends.
#[derive(Debug)]
pub struct PcmDrain<R> {
    reader: Option<R>,
    max_chunk: usize,
}

impl<R: AsyncRead + Unpin> PcmDrain<R> {
    pub fn new(reader: R, max_chunk: usize) -> Self {
        Self {
            reader: Some(reader),
            max_chunk: max_chunk.max(1),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.reader.is_none()
    }

    /// Pull the next chunk. `None` once the output is exhausted.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        let reader = self.reader.as_mut()?;
        let mut buf = BytesMut::zeroed(self.max_chunk);
        match reader.read(&mut buf[..]).await {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf.freeze()))
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> {
        futures_util::stream::unfold(self, |mut drain| async move {
            drain.next_chunk().await.map(|item| (item, drain))
        })
    }
}

/// Drain every chunk into `sink` until the output is exhausted.
///
/// Each chunk is awaited by the sink before the next read. Read failures
/// are `Pipe` errors; sink failures stop the drain and are returned as is.
pub async fn forward_output<R, S>(
    mut drain: PcmDrain<R>,
    sink: &mut S,
    stats: &SessionStats,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    S: PcmSink,
{
    while let Some(chunk) = drain.next_chunk().await {
        let chunk = chunk.map_err(RelayError::output_pipe)?;
        trace!(size = chunk.len(), "PCM chunk read");
        stats.record_out(chunk.len());
        sink.consume(chunk).await?;
    }
    debug!(bytes = stats.snapshot().bytes_out, "Transcoder output exhausted");
    Ok(())
}
