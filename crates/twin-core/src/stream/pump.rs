//! Background fragment pump.
//!
//! A producer task pulls fragments from the completion backend and pushes
//! them into a bounded channel. When the channel is full the producer waits,
//! so a slow reader throttles generation instead of growing a buffer. When
//! the reader goes away the producer is aborted and the backend stream (and
//! its connection) is dropped.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug};

use twin_types::llm::CompletionError;

use crate::llm::client::FragmentStream;

/// Single-consumer end of a fragment pump.
///
/// Yields fragments in generation order. After an `Err` item the stream ends.
pub struct FragmentReceiver {
    rx: mpsc::Receiver<Result<String, CompletionError>>,
    producer: JoinHandle<()>,
}

/// Spawn a producer task draining `source` into a channel of `capacity` slots.
///
/// Must be called from within a Tokio runtime. The producer runs inside the
/// caller's current span.
pub fn spawn_fragment_pump(mut source: FragmentStream, capacity: usize) -> FragmentReceiver {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let producer = tokio::spawn(async move {
        while let Some(item) = source.next().await {
            let failed = item.is_err();
            if tx.send(item).await.is_err() {
                debug!("Fragment reader dropped, abandoning completion stream");
                return;
            }
            if failed {
                return;
            }
        }
    }
    .in_current_span());

    FragmentReceiver { rx, producer }
}

impl Stream for FragmentReceiver {
    type Item = Result<String, CompletionError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for FragmentReceiver {
    fn drop(&mut self) {
        self.producer.abort();
    }
}
