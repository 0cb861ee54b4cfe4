//! Incremental server-sent-event framing
//!
//! Chunks from the HTTP body arrive with arbitrary boundaries; the parser
//! buffers bytes until a full line is available and emits the joined `data`
//! payload of every event on its terminating blank line.

use super::TransportError;
use futures::{Stream, StreamExt};

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no line terminator
    scanned: usize,
    /// The last line ended in `\r`; a leading `\n` in the next chunk belongs to it
    skip_lf: bool,
    data: String,
    has_data: bool,
}

impl SseParser {
    /// Feed one body chunk, returning every frame it completes.
    ///
    /// Lines end in `\n`, `\r\n` or a bare `\r`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut chunk = chunk;
        if self.skip_lf && !chunk.is_empty() {
            self.skip_lf = false;
            chunk = chunk.strip_prefix(b"\n").unwrap_or(chunk);
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        {
            let end = self.scanned + offset;
            let mut next = end + 1;
            if self.buffer[end] == b'\r' {
                match self.buffer.get(next) {
                    Some(b'\n') => next += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }

            let line = String::from_utf8_lossy(&self.buffer[line_start..end]).into_owned();
            line_start = next;
            self.scanned = next;
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        self.buffer.drain(..line_start);
        self.scanned = self.buffer.len();
        frames
    }

    /// Flush at end of body: an unterminated final event is still delivered
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        self.skip_lf = false;
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // `event`, `id` and `retry` carry nothing this client uses
        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        let data = std::mem::take(&mut self.data);
        Some(unwrap_nested_data(&data))
    }
}

/// Some backends hand pre-formatted `data: ...` strings to an SSE library that
/// frames them again; peel the inner prefix so the JSON payload decodes.
fn unwrap_nested_data(data: &str) -> String {
    let trimmed = data.trim();
    match trimmed.strip_prefix("data:") {
        Some(inner) => inner.trim().to_string(),
        None => data.to_string(),
    }
}

/// Turn a stream of body chunks into a stream of frame payloads.
///
/// A chunk error is forwarded once and ends the stream.
pub fn frames<S, B>(chunks: S) -> impl Stream<Item = Result<String, TransportError>> + Send
where
    S: Stream<Item = Result<B, TransportError>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    async_stream::stream! {
        let mut parser = SseParser::default();
        let mut chunks = Box::pin(chunks);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in parser.push(bytes.as_ref()) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if let Some(frame) = parser.finish() {
            yield Ok(frame);
        }
    }
}
