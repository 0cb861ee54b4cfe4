//! Transport session: one streaming request per conversation turn
//!
//! A [`ChatBackend`] produces raw frames; [`TransportSession`] decodes them,
//! folds transport failures into `error` events and supports prompt,
//! idempotent cancellation.

mod error;
mod http;
pub mod sse;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpBackend;

use crate::protocol::{decode, ServerEvent, TurnRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Raw frame payloads of one response, in arrival order
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// Source of streamed chat responses
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the turn and return the response's frames as they arrive
    async fn open_stream(&self, request: &TurnRequest) -> Result<FrameStream, TransportError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn open_stream(&self, request: &TurnRequest) -> Result<FrameStream, TransportError> {
        (**self).open_stream(request).await
    }
}

/// The decoded, cancellable event sequence of one turn.
///
/// The sequence ends after `complete`, after a terminal error, or on
/// cancellation. Cancellation emits nothing.
pub struct TransportSession {
    cancel: CancellationToken,
    events: BoxStream<'static, ServerEvent>,
    finished: bool,
}

impl TransportSession {
    /// Start the request for `request`; frames are read as they arrive.
    pub fn open<B>(backend: Arc<B>, request: TurnRequest) -> Self
    where
        B: ChatBackend + ?Sized + 'static,
    {
        Self {
            cancel: CancellationToken::new(),
            events: event_stream(backend, request).boxed(),
            finished: false,
        }
    }

    /// Abort the request. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this session when triggered from elsewhere
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the sequence has ended
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        if self.finished {
            return None;
        }

        let next = tokio::select! {
            biased;

            () = self.cancel.cancelled() => None,
            event = self.events.next() => event,
        };

        if next.is_none() {
            self.finished = true;
            // Drops the response body, closing the connection
            self.events = futures::stream::empty().boxed();
        }
        next
    }
}

fn event_stream<B>(backend: Arc<B>, request: TurnRequest) -> impl futures::Stream<Item = ServerEvent> + Send
where
    B: ChatBackend + ?Sized + 'static,
{
    async_stream::stream! {
        let mut frames = match backend.open_stream(&request).await {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(kind = ?e.kind, error = %e, "Failed to open chat stream");
                yield ServerEvent::error(e.message);
                return;
            }
        };

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(data) => match decode(&data) {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to decode event frame");
                        yield ServerEvent::error(e.to_string());
                    }
                },
                Err(e) => {
                    tracing::warn!(kind = ?e.kind, error = %e, "Chat stream failed");
                    yield ServerEvent::error(e.message);
                    return;
                }
            }
        }
    }
}
