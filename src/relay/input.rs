//! Inbound relay: client connection -> transcoder stdin

use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use super::connection::{AudioConnection, Received};
use super::stats::SessionStats;
use crate::error::{RelayError, Result};
use crate::transcoder::ProcessInput;

/// Forward every binary message from `conn` into the transcoder input.
///
/// One chunk is written and flushed before the next receive, so at most one
/// chunk is in flight ahead of the transcoder. The input is closed exactly
/// once when the relay stops, whatever the reason.
pub async fn relay_inbound<C, W>(
    conn: &mut C,
    mut input: ProcessInput<W>,
    stats: &SessionStats,
) -> Result<()>
where
    C: AudioConnection,
    W: AsyncWrite + Unpin,
{
    let result = pump(conn, &mut input, stats).await;
    if let Err(e) = &result {
        warn!(error = %e, "Inbound relay stopped");
    }
    input.close().await;
    debug!("Transcoder input closed");
    result
}

async fn pump<C, W>(conn: &mut C, input: &mut ProcessInput<W>, stats: &SessionStats) -> Result<()>
where
    C: AudioConnection,
    W: AsyncWrite + Unpin,
{
    loop {
        let chunk = match conn.recv().await? {
            Received::Chunk(chunk) => chunk,
            Received::Disconnected => {
                info!("Client disconnected");
                return Ok(());
            }
        };
        if chunk.is_empty() {
            continue;
        }
        if input.is_closed() {
            debug!("Transcoder input already closing");
            return Ok(());
        }

        match input.write_chunk(&chunk).await {
            Ok(()) => stats.record_in(chunk.len()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("Transcoder stopped reading input");
                return Ok(());
            }
            Err(e) => return Err(RelayError::input_pipe(e)),
        }
    }
}
