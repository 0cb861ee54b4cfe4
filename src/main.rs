//! hassai - terminal client for the hassAI assistant backend
//!
//! Reads one utterance per line from stdin (lines starting with `~` are
//! treated as interim transcripts) and streams the assistant's replies to
//! stdout. Logs go to stderr as JSON.

use hassai::session::{LineRecognizer, SpeechRecognizer};
use hassai::{ClientConfig, ConversationState, HttpBackend, Notice, Role, SessionManager};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout carries the conversation
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "hassai=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(backend = %config.base_url, voice = config.voice, "Starting hassai");

    let backend = Arc::new(HttpBackend::new(&config)?);
    if let Err(e) = backend.health().await {
        tracing::warn!(kind = ?e.kind, error = %e, "Backend health check failed");
    }

    let handle = SessionManager::spawn(backend, ConversationState::new(config.voice));
    let renderer = tokio::spawn(render(handle.updates(), handle.notices()));

    let mut recognizer = LineRecognizer::new(BufReader::new(tokio::io::stdin()));
    let streams = recognizer.start().await?;
    let input = handle.attach_recognizer(streams, CancellationToken::new());

    tokio::select! {
        result = input => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Input task failed");
            }
        }
        _ = tokio::signal::ctrl_c() => interrupted(),
    }

    // Input is exhausted; let the last reply finish
    handle.flush().await?;
    let mut state_rx = handle.subscribe();
    tokio::select! {
        _ = state_rx.wait_for(|state| !state.streaming) => {}
        _ = tokio::signal::ctrl_c() => interrupted(),
    }

    drop(state_rx);
    drop(handle);
    renderer.await?;
    tracing::info!("Shutting down");
    Ok(())
}

fn interrupted() -> ! {
    tracing::info!("Interrupted");
    // The stdin reader blocks a runtime thread until the next line
    std::process::exit(130);
}

async fn render(mut updates: WatchStream<ConversationState>, mut notices: broadcast::Receiver<Notice>) {
    let mut renderer = Renderer::default();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            state = updates.next() => {
                let Some(state) = state else { break };
                if let Err(e) = renderer.render(&state, &mut stdout) {
                    tracing::warn!(error = %e, "Failed to write output");
                    break;
                }
            }
            notice = notices.recv() => match notice {
                Ok(Notice::RecognitionError { message }) => {
                    let _ = writeln!(stdout, "[voice] {message}");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Notice receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Prints assistant text incrementally from successive snapshots
#[derive(Default)]
struct Renderer {
    printed: HashMap<String, usize>,
    finished: HashSet<String>,
    last_error: Option<String>,
}

impl Renderer {
    fn render(&mut self, state: &ConversationState, out: &mut impl Write) -> std::io::Result<()> {
        for message in state.messages.iter().filter(|m| m.role == Role::Assistant) {
            if self.finished.contains(&message.id) {
                continue;
            }

            let printed = self.printed.entry(message.id.clone()).or_insert(0);
            if let Some(fresh) = message.text.get(*printed..).filter(|s| !s.is_empty()) {
                if *printed == 0 {
                    write!(out, "assistant> ")?;
                }
                write!(out, "{fresh}")?;
                *printed = message.text.len();
            }
            if !message.streaming {
                if *printed > 0 {
                    writeln!(out)?;
                }
                self.finished.insert(message.id.clone());
            }
        }

        if state.error != self.last_error {
            if let Some(error) = &state.error {
                writeln!(out, "error: {error}")?;
            }
            self.last_error.clone_from(&state.error);
        }
        out.flush()
    }
}
