// Transport boundary — the engine's view of the underlying HTTP client.

pub mod http_transport;
pub mod traits;
