use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// Request method at the granularity the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything a transport needs to allocate a request handle.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub address: String,
    pub method: Method,
    pub content_type: Option<String>,
    /// Body attached whole at build time. Used by form-carrying downloads;
    /// streamed uploads leave this empty and go through `begin_send`.
    pub inline_body: Option<Bytes>,
}

/// Transport-neutral response metadata.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub final_url: String,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Cancellation side of one request. Cloneable; `abort` is idempotent and
/// a no-op once the request has already completed.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when `abort` has been called. Never resolves otherwise.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

/// Factory side of the transport. `prepare` must be synchronous, perform no
/// I/O, and fail with [`EngineError::Address`] on a bad address; every later
/// failure belongs to the driver's async operations.
pub trait Transport: Send + Sync {
    fn prepare(&self, spec: RequestSpec) -> Result<Box<dyn RequestDriver>, EngineError>;
}

/// One in-flight request. Drivers must honor the abort contract: after
/// `abort_handle().abort()`, any pending `begin_send` / `begin_receive` /
/// sink / body operation resolves promptly with an error.
#[async_trait]
pub trait RequestDriver: Send {
    fn abort_handle(&self) -> AbortHandle;

    /// Start the request and expose its body as a writable sink.
    /// Suspension point: resolves once the transport is ready to accept
    /// body bytes.
    async fn begin_send(&mut self, content_length: u64) -> Result<Box<dyn StreamSink>, EngineError>;

    /// Await the response head. Suspension point: resolves once response
    /// metadata is available (after the body has been fully sent, when a
    /// send phase ran).
    async fn begin_receive(&mut self) -> Result<Box<dyn ResponseReader>, EngineError>;
}

/// Writable request-body stream handed out by `begin_send`.
#[async_trait]
pub trait StreamSink: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), EngineError>;

    /// Signal end of body. No writes may follow.
    async fn finish(&mut self) -> Result<(), EngineError>;
}

/// Received response: metadata plus a one-shot whole-body read.
#[async_trait]
pub trait ResponseReader: Send {
    fn head(&self) -> &ResponseHead;

    async fn read_body(&mut self) -> Result<String, EngineError>;
}
