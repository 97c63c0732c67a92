//! Byte sources feeding the frame parser, and the event stream that joins them.
//!
//! A [`ChunkSource`] yields raw byte chunks in arrival order. The HTTP source
//! lives in [`crate::client`]; this module provides the file replay and the
//! offline stub, plus [`EventStream`], which turns any source into a sequence
//! of [`StreamEvent`]s and maps transport failures onto user-visible text.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::event::StreamEvent;
use super::parser::FrameParser;
use super::payload::{encode_frame, sample_sign_up_flow};
use crate::error::ErrorCode;

/// Shown when the upstream rejects a request without saying why.
pub const GENERIC_FAILURE: &str = "Something unfortunate happened";

pub const DEFAULT_REPLAY_CHUNK: usize = 64;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent (connect, DNS, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The upstream answered with a non-success status.
    #[error("upstream returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The body failed mid-stream.
    #[error("body read failed: {0}")]
    Body(String),

    /// The read was abandoned on purpose.
    #[error("stream aborted")]
    Aborted,

    /// A local input (replay file) could not be read.
    #[error("source read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl TransportError {
    /// Text a session shows for this failure. `None` for a deliberate abort,
    /// which is never reported as an error.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Aborted => None,
            Self::Status { reason, .. } if reason.trim().is_empty() => Some(GENERIC_FAILURE.to_owned()),
            Self::Status { reason, .. } => Some(reason.clone()),
            other => Some(format!("Server error: {other}")),
        }
    }
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_TRANSPORT_REQUEST",
            Self::Status { .. } => "E_TRANSPORT_STATUS",
            Self::Body(_) => "E_TRANSPORT_BODY",
            Self::Aborted => "E_TRANSPORT_ABORTED",
            Self::Io(_) => "E_TRANSPORT_IO",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Body(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// Ordered producer of raw byte chunks.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, or `Ok(None)` once the source is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

#[async_trait]
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).next_chunk().await
    }
}

/// Replays a fixed byte buffer in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    chunks: VecDeque<Vec<u8>>,
}

impl ReplaySource {
    /// Split `bytes` into chunks of `chunk_size` (at least one byte each).
    #[must_use]
    pub fn from_bytes(bytes: &[u8], chunk_size: usize) -> Self {
        let chunks = bytes.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect();
        Self { chunks }
    }

    /// Replay chunks exactly as given.
    #[must_use]
    pub fn from_chunks(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self { chunks: chunks.into_iter().collect() }
    }

    /// Replay a captured stream from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the file cannot be read.
    pub async fn from_file(path: &Path, chunk_size: usize) -> Result<Self, TransportError> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), chunk_size, "replay: loaded capture");
        Ok(Self::from_bytes(&bytes, chunk_size))
    }

    /// Offline stand-in for the streaming endpoint: the sample sign-up flow,
    /// encoded the way the endpoint would send it.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the sample cannot be encoded.
    pub fn stub(chunk_size: usize) -> Result<Self, serde_json::Error> {
        let text = encode_frame(Some("Here is a sign-up flow."), &sample_sign_up_flow())?;
        Ok(Self::from_bytes(text.as_bytes(), chunk_size))
    }
}

#[async_trait]
impl ChunkSource for ReplaySource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.chunks.pop_front())
    }
}

// =============================================================================
// EVENT STREAM
// =============================================================================

/// Pulls chunks from a source through a [`FrameParser`] and hands out events
/// one at a time.
///
/// The stream ends after `End` or `Error`; a deliberate abort ends it with no
/// terminal event at all.
pub struct EventStream<S> {
    source: S,
    parser: FrameParser,
    queue: VecDeque<StreamEvent>,
    finished: bool,
}

impl<S: ChunkSource> EventStream<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_parser(source, FrameParser::new())
    }

    #[must_use]
    pub fn with_parser(source: S, parser: FrameParser) -> Self {
        Self { source, parser, queue: VecDeque::new(), finished: false }
    }

    /// Element fragments the parser has dropped so far.
    #[must_use]
    pub fn skipped_fragments(&self) -> usize {
        self.parser.skipped_fragments()
    }

    /// Next event, or `None` when the stream is over.
    ///
    /// Cancel-safe: dropping the returned future between polls loses at most
    /// the chunk being read, never a parsed event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            match self.source.next_chunk().await {
                Ok(Some(chunk)) => self.queue.extend(self.parser.feed(&chunk)),
                Ok(None) => {
                    self.finished = true;
                    self.queue.extend(self.parser.finish());
                }
                Err(err) => {
                    self.finished = true;
                    match err.user_message() {
                        Some(message) => {
                            debug!(error = %err, code = err.error_code(), "stream: transport failure");
                            self.queue.push_back(StreamEvent::Error(message));
                        }
                        None => info!("stream aborted"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
