use std::time::Duration;

use serde::Deserialize;

/// Size of each upload chunk in bytes. Payloads smaller than this are
/// written as a single chunk.
pub const UPLOAD_CHUNK_SIZE: usize = 1024;

/// Default per-stage timeout in milliseconds when the caller does not
/// supply one.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Connection options applied when the HTTP transport is constructed.
///
/// Deliberately explicit construction-time settings rather than
/// process-wide mutable state: one transport, one pool policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// How long an idle keep-alive connection stays open, in seconds.
    pub pool_idle_timeout_secs: u64,
    /// Maximum number of idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Disable Nagle's algorithm. Requests are never sent as trickles of
    /// data, so coalescing only adds latency.
    pub tcp_nodelay: bool,
    /// Optional TCP connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

impl TransportConfig {
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout_secs: 60,
            pool_max_idle_per_host: 20,
            tcp_nodelay: true,
            connect_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.pool_idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(config.tcp_nodelay);
        assert!(config.connect_timeout().is_none());
    }
}
