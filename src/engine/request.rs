use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::transport::traits::ResponseHead;

/// Immutable description of one in-flight operation. Owned exclusively by
/// the pipeline task driving that request; dropped once the terminal event
/// has been posted.
pub(crate) struct RequestContext {
    pub address: String,
    /// `None` means no upload phase at all.
    pub payload: Option<Bytes>,
    pub content_type: Option<String>,
    pub timeout: Duration,
}

/// Caller-side identifier for one request. Cheap to copy; carried by every
/// event a request emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Upload progress estimate, 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub percentage: u8,
}

/// Terminal result of one request. Exactly one is produced per request.
#[derive(Debug)]
pub enum TransferOutcome {
    Success { head: ResponseHead, body: String },
    Failure(EngineError),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            Self::Failure(err) => Some(err),
            Self::Success { .. } => None,
        }
    }
}

/// Event posted onto a request's channel. All `Progress` events precede the
/// single terminal `Complete`.
#[derive(Debug)]
pub enum TransferEvent {
    Progress(ProgressSample),
    Complete(TransferOutcome),
}

pub(crate) type EventSender = mpsc::UnboundedSender<TransferEvent>;

/// Receiving side of one request, returned immediately by the engine's
/// entry points while the pipelines run on their own task.
pub struct Transfer {
    handle: RequestHandle,
    events: mpsc::UnboundedReceiver<TransferEvent>,
}

impl Transfer {
    pub(crate) fn new(handle: RequestHandle, events: mpsc::UnboundedReceiver<TransferEvent>) -> Self {
        Self { handle, events }
    }

    pub fn handle(&self) -> RequestHandle {
        self.handle
    }

    /// Next event, in emission order. `None` only after the terminal event
    /// has been delivered.
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// Discard progress and await the terminal outcome.
    pub async fn join(mut self) -> TransferOutcome {
        while let Some(event) = self.events.recv().await {
            if let TransferEvent::Complete(outcome) = event {
                return outcome;
            }
        }
        // The pipeline task always posts Complete before exiting; reaching
        // here means it was torn down mid-flight (runtime shutdown).
        TransferOutcome::Failure(EngineError::transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "pipeline task dropped before completion",
        )))
    }

    /// Registered-handler consumption: forwards events to the callbacks on
    /// a spawned dispatcher task. The completion handler runs exactly once,
    /// after every progress notification.
    pub fn dispatch<C>(self, on_complete: C) -> RequestHandle
    where
        C: FnOnce(RequestHandle, TransferOutcome) + Send + 'static,
    {
        self.dispatch_with_progress(on_complete, |_, _| {})
    }

    pub fn dispatch_with_progress<C, P>(mut self, on_complete: C, mut on_progress: P) -> RequestHandle
    where
        C: FnOnce(RequestHandle, TransferOutcome) + Send + 'static,
        P: FnMut(RequestHandle, u8) + Send + 'static,
    {
        let handle = self.handle;
        tokio::spawn(async move {
            let mut on_complete = Some(on_complete);
            while let Some(event) = self.events.recv().await {
                match event {
                    TransferEvent::Progress(sample) => on_progress(handle, sample.percentage),
                    TransferEvent::Complete(outcome) => {
                        if let Some(complete) = on_complete.take() {
                            complete(handle, outcome);
                        }
                        break;
                    }
                }
            }
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> (EventSender, Transfer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Transfer::new(RequestHandle::new(7), rx))
    }

    #[tokio::test]
    async fn test_join_returns_terminal_outcome() {
        let (tx, transfer) = transfer();
        tx.send(TransferEvent::Progress(ProgressSample { percentage: 40 }))
            .unwrap();
        tx.send(TransferEvent::Complete(TransferOutcome::Failure(
            EngineError::Aborted,
        )))
        .unwrap();

        let outcome = transfer.join().await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failure(EngineError::Aborted)
        ));
    }

    #[tokio::test]
    async fn test_dispatch_orders_progress_before_completion() {
        let (tx, transfer) = transfer();
        for pct in [0u8, 40, 100] {
            tx.send(TransferEvent::Progress(ProgressSample { percentage: pct }))
                .unwrap();
        }
        tx.send(TransferEvent::Complete(TransferOutcome::Failure(
            EngineError::Aborted,
        )))
        .unwrap();

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        transfer.dispatch_with_progress(
            move |handle, outcome| {
                let _ = done_tx.send((handle, outcome.is_success()));
            },
            move |_, pct| {
                let _ = seen_tx.send(pct);
            },
        );

        let (handle, success) = done_rx.await.unwrap();
        assert_eq!(handle.id(), 7);
        assert!(!success);

        let mut seen = Vec::new();
        while let Ok(pct) = seen_rx.try_recv() {
            seen.push(pct);
        }
        assert_eq!(seen, vec![0, 40, 100]);
    }
}
