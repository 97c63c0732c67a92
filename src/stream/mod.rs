//! Upstream stream handling: raw bytes in, [`StreamEvent`]s out.
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   ChunkSource (HTTP / replay / stub)
//!        │  Vec<u8> chunks, split anywhere
//!        ▼
//!   FrameParser ── state machine over escaped JSON
//!        │  Message / NodeBatch / End
//!        ▼
//!   EventStream ── queues events, maps transport failures to Error
//! ```

pub mod event;
pub mod parser;
pub mod payload;
pub mod source;

pub use event::StreamEvent;
pub use parser::{FrameParser, ParserState, Sentinels};
pub use payload::{encode_frame, sample_sign_up_flow};
pub use source::{ChunkSource, EventStream, ReplaySource, TransportError};
