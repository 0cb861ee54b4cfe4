//! Speech capture capability
//!
//! A recognizer exposes its output as two streams: transcripts, interim or
//! final, and recognition errors. The session consumes them as ordinary
//! local actions.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Marks an interim line for [`LineRecognizer`]
const INTERIM_PREFIX: char = '~';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
}

impl Transcript {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Output of a running recognizer
pub struct RecognitionStreams {
    pub transcripts: BoxStream<'static, Transcript>,
    pub errors: BoxStream<'static, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("Recognizer already started")]
    AlreadyStarted,
    #[error("Speech recognition unavailable: {0}")]
    Unavailable(String),
}

/// Audio-to-text capture service
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Begin capture
    async fn start(&mut self) -> Result<RecognitionStreams, RecognitionError>;

    /// End capture; both streams finish
    async fn stop(&mut self);
}

/// Recognizer fed from text lines, e.g. stdin or a dictation pipe.
///
/// Each non-empty line is a final transcript; a line starting with `~` is an
/// interim one.
pub struct LineRecognizer<R> {
    reader: Option<R>,
    stop: CancellationToken,
}

impl<R> LineRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            stop: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl<R> SpeechRecognizer for LineRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<RecognitionStreams, RecognitionError> {
        let reader = self.reader.take().ok_or(RecognitionError::AlreadyStarted)?;
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let stop = self.stop.clone();

        let transcripts = async_stream::stream! {
            let mut lines = reader.lines();
            loop {
                let line = tokio::select! {
                    () = stop.cancelled() => break,
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) => {
                        if let Some(transcript) = parse_line(&line) {
                            yield transcript;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Transcript source failed");
                        let _ = error_tx.send(format!("Failed to read transcript: {e}"));
                        break;
                    }
                }
            }
        };

        Ok(RecognitionStreams {
            transcripts: transcripts.boxed(),
            errors: UnboundedReceiverStream::new(error_rx).boxed(),
        })
    }

    async fn stop(&mut self) {
        self.stop.cancel();
    }
}

fn parse_line(line: &str) -> Option<Transcript> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }
    match line.strip_prefix(INTERIM_PREFIX) {
        Some(interim) => Some(Transcript::interim(interim.trim_start())),
        None => Some(Transcript::complete(line)),
    }
}
