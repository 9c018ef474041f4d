use std::error::Error as StdError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors produced by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The target address is missing, unparseable, or uses an unsupported
    /// scheme. The only error surfaced synchronously from an entry call.
    #[error("invalid request address: {0}")]
    Address(String),

    /// Failure opening the upload sink, writing to it, obtaining the
    /// response, or reading its body. Always delivered through the
    /// terminal transfer event, never thrown at the caller.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The request handle was aborted while this stage was in flight.
    /// Timeout expiry surfaces as this variant on whichever stage it
    /// interrupted.
    #[error("request aborted")]
    Aborted,
}

impl EngineError {
    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}
