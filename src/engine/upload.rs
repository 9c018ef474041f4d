// Upload pipeline — chunked body writing with progress emission.

use bytes::Bytes;
use tracing::debug;

use super::request::{EventSender, ProgressSample, TransferEvent};
use crate::config::UPLOAD_CHUNK_SIZE;
use crate::error::EngineError;
use crate::transport::traits::StreamSink;

/// Index-weighted progress estimate for chunk `index` (0-based) of
/// `bytes_read` bytes out of `total_len` total. Kept identical to the
/// formula existing consumers calibrated against; note it is not a
/// cumulative-bytes percentage and is not monotonic when the last chunk is
/// short. The loop always emits a final 100 regardless.
pub(crate) fn progress_percentage(bytes_read: usize, index: usize, total_len: usize) -> u8 {
    let scaled = bytes_read as u128 * index as u128 * 100 / total_len as u128;
    scaled.min(100) as u8
}

/// Write `payload` through the sink in sequential chunks, posting a
/// progress event after every chunk and a forced 100 after the last.
///
/// Any sink failure short-circuits; the caller turns it into the terminal
/// Failure outcome without entering the response phase.
pub(crate) async fn run(
    payload: &Bytes,
    sink: &mut dyn StreamSink,
    events: &EventSender,
) -> Result<(), EngineError> {
    debug_assert!(!payload.is_empty(), "empty payloads skip the upload phase");

    let total = payload.len();
    let chunk_size = UPLOAD_CHUNK_SIZE.min(total);

    let mut offset = 0;
    let mut index = 0usize;
    while offset < total {
        let end = (offset + chunk_size).min(total);
        let chunk = payload.slice(offset..end);
        let bytes_read = chunk.len();

        sink.write(chunk).await?;

        let percentage = progress_percentage(bytes_read, index, total);
        let _ = events.send(TransferEvent::Progress(ProgressSample { percentage }));

        index += 1;
        offset = end;
    }

    // Terminal sample is always an exact 100.
    let _ = events.send(TransferEvent::Progress(ProgressSample { percentage: 100 }));

    sink.finish().await?;
    debug!(bytes = total, chunks = index, "upload body written");
    Ok(())
}
