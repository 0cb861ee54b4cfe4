//! Mock backend for testing
//!
//! Turns are scripted ahead of time, or driven live from the test through a
//! [`LiveTurn`] handle.

use super::{ChatBackend, FrameStream, TransportError};
use crate::protocol::{to_wire, ServerEvent, TurnRequest};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Serialize an event the way the backend frames it
pub fn frame(event: &ServerEvent) -> String {
    serde_json::to_string(&to_wire(event)).unwrap()
}

/// Scripted behaviour for one `open_stream` call
pub enum MockTurn {
    /// Yield these frames, then end the body
    Frames(Vec<Result<String, TransportError>>),
    /// Fail before any frame arrives
    Refuse(TransportError),
    /// Frames are pushed by the test; the body stays open until the sender drops
    Live(mpsc::UnboundedReceiver<Result<String, TransportError>>),
}

impl MockTurn {
    pub fn frames(frames: Vec<Result<String, TransportError>>) -> Self {
        MockTurn::Frames(frames)
    }

    /// Frames for a complete reply made of `deltas`
    pub fn reply(deltas: &[&str]) -> Self {
        let mut frames: Vec<_> = deltas
            .iter()
            .map(|d| Ok(frame(&ServerEvent::TokenDelta { text: (*d).to_string() })))
            .collect();
        frames.push(Ok(frame(&ServerEvent::Complete { text: None })));
        MockTurn::Frames(frames)
    }
}

/// Test-side end of a [`MockTurn::Live`] body
pub struct LiveTurn {
    tx: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl LiveTurn {
    /// Push one frame; ignored once the session has gone away
    pub fn send(&self, frame: String) {
        let _ = self.tx.send(Ok(frame));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }

    /// Whether the reading side dropped the body (connection closed)
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn wait_closed(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.tx.closed()).await.is_ok()
    }
}

/// Mock backend that replays queued turns and records every request
#[derive(Default)]
pub struct MockBackend {
    turns: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, turn: MockTurn) {
        self.turns.lock().unwrap().push_back(turn);
    }

    /// Queue a live turn and return its driving handle
    pub fn queue_live(&self) -> LiveTurn {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queue(MockTurn::Live(rx));
        LiveTurn { tx }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until at least `count` requests were made
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.requests.lock().unwrap().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn open_stream(&self, request: &TurnRequest) -> Result<FrameStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(MockTurn::Frames(frames)) => Ok(futures::stream::iter(frames).boxed()),
            Some(MockTurn::Refuse(error)) => Err(error),
            Some(MockTurn::Live(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            None => Err(TransportError::network("No mock turn queued")),
        }
    }
}
