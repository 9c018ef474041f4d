use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use transfer_engine::transport::http_transport::HttpTransport;
use transfer_engine::transport::traits::{Method, RequestSpec, Transport};
use transfer_engine::{Engine, EngineError, TransferEvent, TransferOutcome, TransportConfig};

async fn slow_get() -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "too late"
}

async fn slow_post(_body: Bytes) -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "too late"
}

async fn fast_get() -> &'static str {
    "ok"
}

async fn start_server() -> SocketAddr {
    let app = Router::new()
        .route("/slow", get(slow_get))
        .route("/slow-post", post(slow_post))
        .route("/fast", get(fast_get));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_deadline_aborts_delayed_response() {
    let addr = start_server().await;
    let engine = Engine::new(&TransportConfig::default()).unwrap();

    // 50 ms deadline against a 500 ms server delay: the guard aborts the
    // handle and the failure arrives through the completion event.
    let started = Instant::now();
    let transfer = engine
        .download(
            &format!("http://{}/slow", addr),
            Duration::from_millis(50),
            None,
        )
        .unwrap();

    match transfer.join().await {
        TransferOutcome::Failure(EngineError::Aborted) => {}
        other => panic!("expected aborted failure, got {other:?}"),
    }
    // Resolved by the deadline, not by the server finally answering.
    assert!(started.elapsed() < Duration::from_millis(450));
}

#[tokio::test]
async fn test_upload_receive_phase_times_out_after_progress() {
    let addr = start_server().await;
    let engine = Engine::new(&TransportConfig::default()).unwrap();

    let mut transfer = engine
        .upload(
            &format!("http://{}/slow-post", addr),
            "small body",
            None,
            Duration::from_millis(50),
        )
        .unwrap();

    // The body goes out fine, so progress is emitted; the delayed response
    // then trips the receive-phase deadline.
    let mut progress = Vec::new();
    let mut outcome = None;
    while let Some(event) = transfer.next_event().await {
        match event {
            TransferEvent::Progress(sample) => progress.push(sample.percentage),
            TransferEvent::Complete(o) => outcome = Some(o),
        }
    }
    assert_eq!(progress, vec![0, 100]);
    assert!(matches!(
        outcome,
        Some(TransferOutcome::Failure(EngineError::Aborted))
    ));
}

#[tokio::test]
async fn test_abort_after_completion_is_noop() {
    let addr = start_server().await;
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();

    let mut driver = transport
        .prepare(RequestSpec {
            address: format!("http://{}/fast", addr),
            method: Method::Get,
            content_type: None,
            inline_body: None,
        })
        .unwrap();

    let abort = driver.abort_handle();
    let mut reader = driver.begin_receive().await.unwrap();
    assert_eq!(reader.head().status, 200);
    assert_eq!(reader.read_body().await.unwrap(), "ok");

    // Aborting a finished request must not fail or fire anything.
    abort.abort();
    abort.abort();
    assert!(abort.is_aborted());
}
