// Response pipeline — await the response head, read the whole body.

use tracing::debug;

use crate::error::EngineError;
use crate::transport::traits::{RequestDriver, ResponseHead};

/// Drive the receive side of a request to a (head, body) pair. Any failure
/// is returned for the caller to fold into the terminal outcome.
pub(crate) async fn run(
    driver: &mut dyn RequestDriver,
) -> Result<(ResponseHead, String), EngineError> {
    let mut reader = driver.begin_receive().await?;
    let head = reader.head().clone();
    let body = reader.read_body().await?;
    debug!(status = head.status, bytes = body.len(), "response body read");
    Ok((head, body))
}
