// Request lifecycle — context construction, upload/response pipelines, and
// per-request deadline enforcement.

pub mod client;
pub mod request;
pub(crate) mod response;
pub(crate) mod timeout;
pub(crate) mod upload;
