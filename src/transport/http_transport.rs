// reqwest-backed transport. One Client per transport, built from explicit
// pool options; each prepared request gets its own driver and abort token.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Body, Client, Url};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::traits::{
    AbortHandle, Method, RequestDriver, RequestSpec, ResponseHead, ResponseReader, StreamSink,
    Transport,
};
use crate::config::TransportConfig;
use crate::error::EngineError;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, EngineError> {
        let mut builder = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_nodelay(config.tcp_nodelay);
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(EngineError::transport)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn prepare(&self, spec: RequestSpec) -> Result<Box<dyn RequestDriver>, EngineError> {
        if spec.address.trim().is_empty() {
            return Err(EngineError::Address("address is empty".into()));
        }
        let url = Url::parse(&spec.address)
            .map_err(|e| EngineError::Address(format!("{}: {}", spec.address, e)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(EngineError::Address(format!(
                    "unsupported scheme: {other}"
                )))
            }
        }

        Ok(Box::new(HttpRequestDriver {
            client: self.client.clone(),
            url,
            method: spec.method,
            content_type: spec.content_type,
            inline_body: spec.inline_body,
            abort: AbortHandle::new(),
            pending: None,
        }))
    }
}

struct HttpRequestDriver {
    client: Client,
    url: Url,
    method: Method,
    content_type: Option<String>,
    inline_body: Option<Bytes>,
    abort: AbortHandle,
    /// Response future of a request started by `begin_send`, harvested by
    /// `begin_receive`.
    pending: Option<oneshot::Receiver<Result<reqwest::Response, EngineError>>>,
}

impl HttpRequestDriver {
    fn base_request(&self) -> reqwest::RequestBuilder {
        let method = match self.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut req = self.client.request(method, self.url.clone());
        if let Some(ct) = &self.content_type {
            req = req.header(header::CONTENT_TYPE, ct.as_str());
        }
        req
    }
}

fn sink_closed() -> EngineError {
    EngineError::transport(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "request body sink closed",
    ))
}

#[async_trait]
impl RequestDriver for HttpRequestDriver {
    fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    async fn begin_send(&mut self, content_length: u64) -> Result<Box<dyn StreamSink>, EngineError> {
        if self.abort.is_aborted() {
            return Err(EngineError::Aborted);
        }

        let (body_tx, body_rx) = mpsc::channel::<Result<Bytes, io::Error>>(1);
        let req = self
            .base_request()
            .header(header::CONTENT_LENGTH, content_length)
            .body(Body::wrap_stream(ReceiverStream::new(body_rx)));

        // The request starts now and pulls body bytes from the channel as
        // the sink is written; its response is picked up in begin_receive.
        let (done_tx, done_rx) = oneshot::channel();
        let abort = self.abort.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                res = req.send() => res.map_err(EngineError::transport),
                _ = abort.aborted() => Err(EngineError::Aborted),
            };
            let _ = done_tx.send(result);
        });
        self.pending = Some(done_rx);

        debug!(url = %self.url, content_length, "upload stream opened");
        Ok(Box::new(ChannelSink {
            tx: Some(body_tx),
            abort: self.abort.clone(),
        }))
    }

    async fn begin_receive(&mut self) -> Result<Box<dyn ResponseReader>, EngineError> {
        let response = if let Some(done) = self.pending.take() {
            match done.await {
                Ok(result) => result?,
                Err(_) => return Err(sink_closed()),
            }
        } else {
            if self.abort.is_aborted() {
                return Err(EngineError::Aborted);
            }
            let mut req = self.base_request();
            if let Some(body) = self.inline_body.take() {
                req = req.body(body);
            }
            tokio::select! {
                res = req.send() => res.map_err(EngineError::transport)?,
                _ = self.abort.aborted() => return Err(EngineError::Aborted),
            }
        };

        let head = ResponseHead {
            status: response.status().as_u16(),
            content_type: response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            content_length: response.content_length(),
            final_url: response.url().to_string(),
        };
        debug!(status = head.status, url = %head.final_url, "response head received");

        Ok(Box::new(HttpResponseReader {
            head,
            response: Some(response),
            abort: self.abort.clone(),
        }))
    }
}

struct ChannelSink {
    tx: Option<mpsc::Sender<Result<Bytes, io::Error>>>,
    abort: AbortHandle,
}

#[async_trait]
impl StreamSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), EngineError> {
        let tx = self.tx.as_ref().ok_or_else(sink_closed)?;
        tokio::select! {
            res = tx.send(Ok(chunk)) => res.map_err(|_| sink_closed()),
            _ = self.abort.aborted() => Err(EngineError::Aborted),
        }
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        // Dropping the sender ends the body stream.
        self.tx.take();
        Ok(())
    }
}

struct HttpResponseReader {
    head: ResponseHead,
    response: Option<reqwest::Response>,
    abort: AbortHandle,
}

#[async_trait]
impl ResponseReader for HttpResponseReader {
    fn head(&self) -> &ResponseHead {
        &self.head
    }

    async fn read_body(&mut self) -> Result<String, EngineError> {
        let response = self.response.take().ok_or_else(|| {
            EngineError::transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                "response body already consumed",
            ))
        })?;
        tokio::select! {
            res = response.text() => res.map_err(EngineError::transport),
            _ = self.abort.aborted() => Err(EngineError::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(address: &str) -> RequestSpec {
        RequestSpec {
            address: address.to_string(),
            method: Method::Get,
            content_type: None,
            inline_body: None,
        }
    }

    #[test]
    fn test_prepare_rejects_empty_address() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        assert!(matches!(
            transport.prepare(spec("")),
            Err(EngineError::Address(_))
        ));
        assert!(matches!(
            transport.prepare(spec("   ")),
            Err(EngineError::Address(_))
        ));
    }

    #[test]
    fn test_prepare_rejects_bad_scheme() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        assert!(matches!(
            transport.prepare(spec("ftp://example.com/a")),
            Err(EngineError::Address(_))
        ));
        assert!(matches!(
            transport.prepare(spec("not a url")),
            Err(EngineError::Address(_))
        ));
    }

    #[test]
    fn test_prepare_accepts_http_url() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        assert!(transport.prepare(spec("http://example.com/upload")).is_ok());
    }
}
