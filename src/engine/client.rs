// Engine facade — public entry points that wire context, transport driver,
// pipelines, and the timeout guard together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::request::{
    EventSender, RequestContext, RequestHandle, Transfer, TransferEvent, TransferOutcome,
};
use super::timeout::TimeoutGuard;
use super::{response, upload};
use crate::config::TransportConfig;
use crate::error::EngineError;
use crate::form::FormSource;
use crate::transport::http_transport::HttpTransport;
use crate::transport::traits::{Method, RequestDriver, RequestSpec, Transport};

pub struct Engine {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
}

impl Engine {
    /// Engine over the default reqwest transport.
    pub fn new(config: &TransportConfig) -> Result<Self, EngineError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Engine over a caller-supplied transport. The extension point for
    /// anything the default transport does not cover.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue a POST-equivalent request, streaming `payload` as the body.
    /// Returns as soon as the pipeline task is spawned; progress and the
    /// terminal outcome arrive as events on the returned [`Transfer`].
    ///
    /// The only synchronous failure is [`EngineError::Address`].
    pub fn upload(
        &self,
        address: &str,
        payload: impl Into<Bytes>,
        content_type: Option<&str>,
        timeout: Duration,
    ) -> Result<Transfer, EngineError> {
        let payload = payload.into();
        let ctx = RequestContext {
            address: address.to_string(),
            // An empty payload skips the upload phase entirely.
            payload: (!payload.is_empty()).then_some(payload),
            content_type: content_type.map(str::to_string),
            timeout,
        };
        self.start(ctx, Method::Post, false)
    }

    /// Convenience overload: upload a form-encoded body, taking the content
    /// type and bytes from the form collaborator.
    pub fn upload_form(
        &self,
        address: &str,
        form: &dyn FormSource,
        timeout: Duration,
    ) -> Result<Transfer, EngineError> {
        let content_type = form.content_type();
        self.upload(address, form.encode(), Some(&content_type), timeout)
    }

    /// Issue a GET-equivalent request. A supplied form contributes its
    /// content type and bytes as an inline body; no progress events are
    /// emitted on this path.
    pub fn download(
        &self,
        address: &str,
        timeout: Duration,
        form: Option<&dyn FormSource>,
    ) -> Result<Transfer, EngineError> {
        let ctx = RequestContext {
            address: address.to_string(),
            payload: form.map(|f| f.encode()).filter(|b| !b.is_empty()),
            content_type: form.map(|f| f.content_type()),
            timeout,
        };
        self.start(ctx, Method::Get, true)
    }

    fn start(
        &self,
        ctx: RequestContext,
        method: Method,
        inline_body: bool,
    ) -> Result<Transfer, EngineError> {
        let spec = RequestSpec {
            address: ctx.address.clone(),
            method,
            content_type: ctx.content_type.clone(),
            inline_body: if inline_body { ctx.payload.clone() } else { None },
        };
        // Address validation happens here, before any task is spawned.
        let driver = self.transport.prepare(spec)?;

        let handle = RequestHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let streamed = !inline_body;

        debug!(
            request = handle.id(),
            address = %ctx.address,
            timeout_ms = ctx.timeout.as_millis() as u64,
            "request dispatched"
        );

        tokio::spawn(async move {
            let outcome = drive(&ctx, driver, streamed, &events_tx).await;
            if let Some(err) = outcome.error() {
                warn!(request = handle.id(), error = %err, "transfer failed");
            }
            // Terminal event; exactly one per request.
            let _ = events_tx.send(TransferEvent::Complete(outcome));
        });

        Ok(Transfer::new(handle, events_rx))
    }
}

/// Run the request to its single terminal outcome. Every error past this
/// point is captured, never propagated to the caller's task.
async fn drive(
    ctx: &RequestContext,
    mut driver: Box<dyn RequestDriver>,
    streamed: bool,
    events: &EventSender,
) -> TransferOutcome {
    let guard = TimeoutGuard::new(ctx.timeout, driver.abort_handle());

    if streamed {
        if let Some(payload) = &ctx.payload {
            let send_stage = async {
                let mut sink = driver.begin_send(payload.len() as u64).await?;
                upload::run(payload, sink.as_mut(), events).await
            };
            if let Err(err) = guard.watch("send", send_stage).await {
                // The response phase is never entered on upload failure.
                return TransferOutcome::Failure(err);
            }
        }
    }

    match guard.watch("receive", response::run(driver.as_mut())).await {
        Ok((head, body)) => TransferOutcome::Success { head, body },
        Err(err) => TransferOutcome::Failure(err),
    }
}
