//! Streamed response aggregation
//!
//! One loop serves every streaming provider. The body is read line by line,
//! never buffered whole; each `data: ` payload is parsed and the provider's
//! delta-text path is appended to the accumulator. A malformed frame
//! (invalid JSON, invalid UTF-8, over-long line) is logged and skipped so the
//! remaining frames still count.

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use llmgate_core::{CancelReason, Error, ProviderConfig, Result, StreamFrame};
use std::io;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest single event-stream line accepted
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One newline-terminated line of the body
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Text(String),
    NotUtf8,
    TooLong,
}

/// Newline framing that reports bad lines as items instead of failing the
/// stream. Only I/O errors from the underlying reader surface as `Err`.
#[derive(Debug)]
struct EventLineCodec {
    max_length: usize,
    /// Index already scanned for a newline
    next_index: usize,
    /// Dropping the rest of an over-long line
    discarding: bool,
}

impl EventLineCodec {
    fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }
}

fn decode_line(bytes: &[u8]) -> Line {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Line::Text(text.to_string()),
        Err(_) => Line::NotUtf8,
    }
}

impl Decoder for EventLineCodec {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<Line>> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            if self.discarding {
                match newline {
                    Some(end) => {
                        buf.advance(end + 1);
                        self.next_index = 0;
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        buf.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                }
            }

            return Ok(match newline {
                Some(end) if end > self.max_length => {
                    buf.advance(end + 1);
                    self.next_index = 0;
                    Some(Line::TooLong)
                }
                Some(end) => {
                    let line = buf.split_to(end + 1);
                    self.next_index = 0;
                    Some(decode_line(&line[..end]))
                }
                None if buf.len() > self.max_length => {
                    buf.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    Some(Line::TooLong)
                }
                None => {
                    self.next_index = buf.len();
                    None
                }
            });
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<Line>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(decode_line(&rest)))
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The provider sent its success terminator (`data: [DONE]`)
    Terminator,
    /// The connection closed without a terminator
    EndOfStream,
}

/// Result of aggregating one streamed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Concatenated deltas; empty when none were observed
    pub text: String,
    pub termination: Termination,
    pub data_frames: usize,
    pub malformed_frames: usize,
}

impl StreamOutcome {
    /// True when the provider normally sends a terminator but this stream lacked one
    pub fn missing_terminator(&self, config: &ProviderConfig) -> bool {
        config.stream_terminator.is_some() && self.termination == Termination::EndOfStream
    }
}

/// Fold a chunked event-stream body into one string.
///
/// Cancellation closes the reader and yields `Cancelled`, never a truncated
/// success. A read failure after the stream started is a hard transport
/// failure.
pub async fn aggregate<S, E>(
    body: S,
    config: &ProviderConfig,
    cancel: &CancellationToken,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let reader = StreamReader::new(Box::pin(body.map(|chunk| chunk.map_err(io::Error::other))));
    let mut lines = FramedRead::new(reader, EventLineCodec::new(MAX_LINE_BYTES));

    let mut outcome = StreamOutcome {
        text: String::new(),
        termination: Termination::EndOfStream,
        data_frames: 0,
        malformed_frames: 0,
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(provider = %config.id, "Stream cancelled by caller");
                return Err(Error::cancelled(CancelReason::Caller));
            }
            line = lines.next() => line,
        };

        let line = match next {
            Some(Ok(Line::Text(line))) => line,
            Some(Ok(bad)) => {
                outcome.malformed_frames += 1;
                warn!(provider = %config.id, line = ?bad, "Skipping undecodable stream line");
                continue;
            }
            Some(Err(e)) => return Err(stream_failure(e)),
            None => break,
        };

        match StreamFrame::classify(&line) {
            StreamFrame::Ignorable => continue,
            StreamFrame::Terminator => {
                outcome.termination = Termination::Terminator;
                break;
            }
            StreamFrame::Data(payload) => {
                outcome.data_frames += 1;
                let value = match serde_json::from_str::<serde_json::Value>(payload) {
                    Ok(value) => value,
                    Err(e) => {
                        outcome.malformed_frames += 1;
                        warn!(provider = %config.id, error = %e, "Skipping malformed stream frame");
                        continue;
                    }
                };
                if let Some(delta) = config.delta_text_path.and_then(|p| p.text_at(&value)) {
                    outcome.text.push_str(delta);
                }
            }
        }
    }

    debug!(
        provider = %config.id,
        data_frames = outcome.data_frames,
        malformed_frames = outcome.malformed_frames,
        chars = outcome.text.len(),
        termination = ?outcome.termination,
        "Stream aggregated"
    );

    Ok(outcome)
}

fn stream_failure(err: io::Error) -> Error {
    Error::ProviderCallFailed {
        status: None,
        body: crate::truncate_body(&format!("Stream interrupted: {}", err)),
        attempts: 1,
    }
}
