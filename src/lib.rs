// Asynchronous HTTP transfer engine — non-blocking uploads and downloads
// with chunked progress events and per-request deadline enforcement.

pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod transport;

pub use config::{TransportConfig, DEFAULT_TIMEOUT_MS, UPLOAD_CHUNK_SIZE};
pub use engine::client::Engine;
pub use engine::request::{
    ProgressSample, RequestHandle, Transfer, TransferEvent, TransferOutcome,
};
pub use error::EngineError;
pub use form::FormSource;
pub use transport::traits::{ResponseHead, Transport};

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Install a global tracing subscriber honoring `RUST_LOG`, with a sane
/// default filter. Safe to call more than once.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("transfer engine tracing initialized");
    });
}
