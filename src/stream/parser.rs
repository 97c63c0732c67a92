//! Incremental extraction of narration and diagram elements from the upstream
//! byte stream.
//!
//! DESIGN
//! ======
//! The upstream wraps a JSON document inside a JSON string, so the interesting
//! text arrives escaped one level deep (`\"steps\": [` rather than
//! `"steps": [`). Chunks split anywhere, including inside a multi-byte UTF-8
//! sequence or in the middle of a sentinel, so the parser is a character-level
//! state machine that carries everything it needs across `feed` calls:
//!
//! ```text
//!   Idle ── narration sentinel ──▶ InNarration ── closing \" ──▶ Idle (emit Message)
//!     │
//!     └──── steps sentinel ─────▶ InArray ── '{' ──▶ InObject{depth}
//!                                   ▲  │                 │
//!                                   │  └── ']' ──▶ Idle  │ depth back to 0
//!                                   └────────────────────┘ (emit NodeBatch)
//! ```
//!
//! Brace counting is string-aware: braces inside an element's string values
//! (say a label of `"{x}"`) never change the depth. An escaped quote is
//! recognised by the length of the backslash run before it. One level of
//! escaping turns the string delimiter `"` into `\"` (run of 1) and an escaped
//! quote inside a value into `\\\"` (run of 3); a literal backslash at the end
//! of a value gives a run of 5. Delimiters are exactly the runs with
//! `len % 4 == 1`.
//!
//! Output is a pure function of the concatenated input: feeding the same bytes
//! in any chunking yields the same event sequence.

use tracing::{debug, warn};

use super::event::StreamEvent;
use crate::model::DiagramElement;

/// Start of the narration string, as it appears after one level of escaping.
pub const NARRATION_SENTINEL: &str = r#"\"message\": \""#;
/// Start of the element array, as it appears after one level of escaping.
pub const STEPS_SENTINEL: &str = r#"\"steps\": ["#;

const LOG_FRAGMENT_CHARS: usize = 120;

/// Marker strings the parser scans for while idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinels {
    pub narration: String,
    pub steps: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self { narration: NARRATION_SENTINEL.to_owned(), steps: STEPS_SENTINEL.to_owned() }
    }
}

/// Where the parser currently is within the upstream document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    InNarration,
    InArray,
    InObject { depth: usize },
}

// =============================================================================
// PARSER
// =============================================================================

pub struct FrameParser {
    sentinels: Sentinels,
    window_cap: usize,
    state: ParserState,
    /// Trailing text seen while idle, long enough to hold either sentinel.
    window: String,
    /// Raw (still escaped) narration or element text being accumulated.
    span: String,
    /// Length of the run of backslashes immediately before the current char.
    backslashes: usize,
    in_string: bool,
    /// Incomplete UTF-8 sequence carried to the next chunk.
    utf8_tail: Vec<u8>,
    skipped: usize,
    finished: bool,
}

impl FrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sentinels(Sentinels::default())
    }

    #[must_use]
    pub fn with_sentinels(sentinels: Sentinels) -> Self {
        let window_cap = sentinels.narration.len().max(sentinels.steps.len());
        Self {
            sentinels,
            window_cap,
            state: ParserState::Idle,
            window: String::new(),
            span: String::new(),
            backslashes: 0,
            in_string: false,
            utf8_tail: Vec::new(),
            skipped: 0,
            finished: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of element fragments that failed to decode and were dropped.
    #[must_use]
    pub fn skipped_fragments(&self) -> usize {
        self.skipped
    }

    /// Consume one chunk of raw bytes and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            debug!(len = chunk.len(), "parser: chunk after end ignored");
            return Vec::new();
        }
        let text = self.decode_utf8(chunk);
        let mut events = Vec::new();
        for c in text.chars() {
            self.step(c, &mut events);
        }
        events
    }

    /// Signal that the upstream closed normally. Emits `End`; any partial
    /// fragment still open is discarded.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        if !self.utf8_tail.is_empty() {
            debug!(bytes = self.utf8_tail.len(), "parser: dropping incomplete utf-8 tail");
            self.utf8_tail.clear();
        }
        match self.state {
            ParserState::InObject { .. } | ParserState::InNarration => {
                warn!(state = ?self.state, len = self.span.len(), "parser: stream ended mid-fragment");
            }
            ParserState::Idle | ParserState::InArray => {}
        }
        self.state = ParserState::Idle;
        self.span.clear();
        vec![StreamEvent::End]
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);
        match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_owned(),
            Err(err) if err.error_len().is_none() => {
                let (head, tail) = bytes.split_at(err.valid_up_to());
                self.utf8_tail = tail.to_vec();
                String::from_utf8_lossy(head).into_owned()
            }
            Err(err) => {
                warn!(error = %err, "parser: invalid utf-8 in stream");
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }

    fn step(&mut self, c: char, events: &mut Vec<StreamEvent>) {
        let escaped_quote = c == '"' && self.backslashes % 4 == 1;
        match self.state {
            ParserState::Idle => self.scan_sentinels(c),
            ParserState::InNarration => {
                if escaped_quote {
                    // The backslash escaping the closing quote is not narration.
                    self.span.pop();
                    events.push(StreamEvent::Message(decode_narration(&self.span)));
                    self.span.clear();
                    self.state = ParserState::Idle;
                } else {
                    self.span.push(c);
                }
            }
            ParserState::InArray => match c {
                '{' => {
                    self.span.clear();
                    self.span.push(c);
                    self.in_string = false;
                    self.state = ParserState::InObject { depth: 1 };
                }
                ']' => self.state = ParserState::Idle,
                _ => {}
            },
            ParserState::InObject { depth } => {
                self.span.push(c);
                if escaped_quote {
                    self.in_string = !self.in_string;
                } else if !self.in_string {
                    match c {
                        '{' => self.state = ParserState::InObject { depth: depth + 1 },
                        '}' if depth == 1 => {
                            self.state = ParserState::InArray;
                            if let Some(event) = self.take_element() {
                                events.push(event);
                            }
                        }
                        '}' => self.state = ParserState::InObject { depth: depth - 1 },
                        _ => {}
                    }
                }
            }
        }
        self.backslashes = if c == '\\' { self.backslashes + 1 } else { 0 };
    }

    fn scan_sentinels(&mut self, c: char) {
        self.window.push(c);
        if self.window.ends_with(self.sentinels.narration.as_str()) {
            self.window.clear();
            self.span.clear();
            self.state = ParserState::InNarration;
        } else if self.window.ends_with(self.sentinels.steps.as_str()) {
            self.window.clear();
            self.state = ParserState::InArray;
        } else if self.window.len() > self.window_cap {
            let mut cut = self.window.len() - self.window_cap;
            while !self.window.is_char_boundary(cut) {
                cut += 1;
            }
            self.window.drain(..cut);
        }
    }

    fn take_element(&mut self) -> Option<StreamEvent> {
        let raw = std::mem::take(&mut self.span);
        let text = unescape_once(&raw).unwrap_or_else(|| legacy_clean(&raw));
        match serde_json::from_str::<DiagramElement>(text.trim()) {
            Ok(element) => Some(StreamEvent::NodeBatch(vec![element])),
            Err(e) => {
                self.skipped += 1;
                let fragment: String = text.chars().take(LOG_FRAGMENT_CHARS).collect();
                warn!(error = %e, %fragment, skipped = self.skipped, "parser: dropping malformed element");
                None
            }
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// UNESCAPING
// =============================================================================

/// Remove one level of JSON string escaping.
fn unescape_once(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).ok()
}

/// Fallback for text that is not a valid escaped JSON string body: drop the
/// escaping of quotes and the escaped newlines between elements.
fn legacy_clean(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\n", "")
}

/// Narration sits two string levels deep: the outer transport string and the
/// inner `message` value.
fn decode_narration(raw: &str) -> String {
    let Some(inner) = unescape_once(raw) else {
        return legacy_clean(raw);
    };
    unescape_once(&inner).unwrap_or(inner)
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
