//! Session manager
//!
//! Owns the conversation state and serializes turns: one task applies every
//! action and server event through [`transition`], while per-turn pump tasks
//! read the transport and hand events back tagged with their turn's
//! generation. Events from a superseded turn never reach the state.

pub mod speech;

pub use speech::{LineRecognizer, RecognitionError, RecognitionStreams, SpeechRecognizer, Transcript};

use crate::protocol::{ServerEvent, TurnRequest};
use crate::state_machine::{transition, ConversationState, Effect, Event, LocalAction, Notice, Stamp};
use crate::transport::{ChatBackend, TransportSession};
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 32;
const TURN_BUFFER: usize = 64;
const NOTICE_BUFFER: usize = 16;

/// Message applied when the transport ends a turn without `complete` or `error`
pub const STREAM_CLOSED_EARLY: &str = "stream closed before completion";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session has shut down")]
    Closed,
}

#[derive(Debug)]
enum Command {
    Apply(Event),
    Transcription { text: String, is_final: bool },
    Flush(oneshot::Sender<()>),
}

/// Output of a pump task, tagged with the turn it belongs to
#[derive(Debug)]
enum TurnSignal {
    Event { generation: u64, event: ServerEvent },
    Closed { generation: u64 },
}

struct ActiveTurn {
    generation: u64,
    cancel: CancellationToken,
}

pub struct SessionManager<B: ChatBackend + ?Sized + 'static> {
    backend: Arc<B>,
    state: ConversationState,
    generation: u64,
    active: Option<ActiveTurn>,
    command_rx: mpsc::Receiver<Command>,
    turn_tx: mpsc::Sender<TurnSignal>,
    turn_rx: mpsc::Receiver<TurnSignal>,
    state_tx: watch::Sender<ConversationState>,
    notice_tx: broadcast::Sender<Notice>,
}

impl<B: ChatBackend + ?Sized + 'static> SessionManager<B> {
    fn new(backend: Arc<B>, state: ConversationState) -> (Self, AssistantHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (turn_tx, turn_rx) = mpsc::channel(TURN_BUFFER);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (notice_tx, _) = broadcast::channel(NOTICE_BUFFER);

        let handle = AssistantHandle {
            command_tx,
            state_rx,
            notice_tx: notice_tx.clone(),
        };
        let manager = Self {
            backend,
            state,
            generation: 0,
            active: None,
            command_rx,
            turn_tx,
            turn_rx,
            state_tx,
            notice_tx,
        };
        (manager, handle)
    }

    /// Start the session task. It runs until every handle is dropped.
    pub fn spawn(backend: Arc<B>, state: ConversationState) -> AssistantHandle {
        let (manager, handle) = Self::new(backend, state);
        tokio::spawn(manager.run());
        handle
    }

    async fn run(mut self) {
        tracing::info!("Starting session");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(signal) = self.turn_rx.recv() => self.handle_turn_signal(signal),
            }
        }

        if let Some(turn) = self.active.take() {
            turn.cancel.cancel();
        }
        tracing::info!("Session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Apply(event) => self.apply(event),
            Command::Transcription { text, is_final } => {
                let submit = is_final && !text.trim().is_empty();
                self.apply(Event::update_input(text.clone()));
                if submit {
                    self.apply(Event::send(text));
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    fn handle_turn_signal(&mut self, signal: TurnSignal) {
        match signal {
            TurnSignal::Event { generation, event } => {
                if generation != self.generation {
                    tracing::debug!(generation, current = self.generation, "Dropping event from superseded turn");
                    return;
                }
                self.apply(Event::Server(event));
            }
            TurnSignal::Closed { generation } => {
                if self.active.as_ref().map(|turn| turn.generation) != Some(generation) {
                    return;
                }
                self.active = None;
                if self.state.streaming {
                    tracing::warn!(generation, "Stream closed before completion");
                    self.apply(Event::Server(ServerEvent::error(STREAM_CLOSED_EARLY)));
                } else {
                    tracing::debug!(generation, "Turn finished");
                }
            }
        }
    }

    fn apply(&mut self, event: Event) {
        let result = transition(&self.state, event, &Stamp::fresh());
        if result.new_state != self.state {
            self.state = result.new_state;
            self.state_tx.send_replace(self.state.clone());
        }
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartTurn { request } => self.start_turn(request),
            Effect::Notify { notice } => {
                // No subscribers is fine
                let _ = self.notice_tx.send(notice);
            }
        }
    }

    fn start_turn(&mut self, request: TurnRequest) {
        if let Some(previous) = self.active.take() {
            tracing::info!(generation = previous.generation, "Superseding turn in flight");
            previous.cancel.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        tracing::info!(
            generation,
            conversation_id = ?request.conversation_id,
            history = request.history.len(),
            voice = request.voice_preferred,
            "Starting turn"
        );

        let mut session = TransportSession::open(self.backend.clone(), request);
        self.active = Some(ActiveTurn {
            generation,
            cancel: session.cancellation_token(),
        });

        let turn_tx = self.turn_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = session.next_event().await {
                if turn_tx.send(TurnSignal::Event { generation, event }).await.is_err() {
                    return;
                }
            }
            let _ = turn_tx.send(TurnSignal::Closed { generation }).await;
        });
    }
}

/// Entry points for the presentation layer
#[derive(Clone)]
pub struct AssistantHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConversationState>,
    notice_tx: broadcast::Sender<Notice>,
}

impl AssistantHandle {
    async fn dispatch(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx.send(command).await.map_err(|_| SessionError::Closed)
    }

    pub async fn update_input(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Command::Apply(Event::update_input(text))).await
    }

    /// Submit `text` as a new turn. Blank text is ignored.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Command::Apply(Event::send(text))).await
    }

    pub async fn set_listening(&self, listening: bool) -> Result<(), SessionError> {
        self.dispatch(Command::Apply(LocalAction::SetListening { listening }.into()))
            .await
    }

    /// Interim text only updates the input; a non-blank final transcript
    /// starts a turn.
    pub async fn on_transcription(&self, text: impl Into<String>, is_final: bool) -> Result<(), SessionError> {
        self.dispatch(Command::Transcription {
            text: text.into(),
            is_final,
        })
        .await
    }

    pub async fn recognition_failed(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Command::Apply(
            LocalAction::RecognitionFailed {
                message: message.into(),
            }
            .into(),
        ))
        .await
    }

    /// Resolve once every action dispatched before this call has been applied
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.dispatch(Command::Flush(done_tx)).await?;
        done_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Current state
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.state_rx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state_rx.clone()
    }

    /// Every published state, starting with the current one
    #[must_use]
    pub fn updates(&self) -> WatchStream<ConversationState> {
        WatchStream::new(self.state_rx.clone())
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Forward a recognizer's output into the session until `cancel` fires,
    /// the transcripts end, or the session shuts down.
    pub fn attach_recognizer(&self, streams: RecognitionStreams, cancel: CancellationToken) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let RecognitionStreams {
                mut transcripts,
                mut errors,
            } = streams;
            let mut errors_open = true;

            loop {
                let delivered = tokio::select! {
                    biased;

                    () = cancel.cancelled() => break,
                    message = errors.next(), if errors_open => match message {
                        Some(message) => handle.recognition_failed(message).await,
                        None => {
                            errors_open = false;
                            Ok(())
                        }
                    },
                    transcript = transcripts.next() => match transcript {
                        Some(Transcript { text, is_final }) => handle.on_transcription(text, is_final).await,
                        None => {
                            // A recognizer may report its failure as it finishes
                            while errors_open {
                                let Some(Some(message)) = errors.next().now_or_never() else {
                                    break;
                                };
                                if handle.recognition_failed(message).await.is_err() {
                                    break;
                                }
                            }
                            break;
                        }
                    },
                };
                if delivered.is_err() {
                    break;
                }
            }
            tracing::debug!("Recognizer detached");
        })
    }
}
