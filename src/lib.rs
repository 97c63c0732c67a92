//! flowsketch: stream a natural-language description into a live diagram.
//!
//! An upstream service answers a request with a byte stream carrying escaped
//! JSON: a narration string and an array of diagram elements. As elements
//! arrive the diagram is re-laid-out and redrawn on a canvas, so the user
//! watches it grow.
//!
//! | Module      | Role                                                        |
//! |-------------|-------------------------------------------------------------|
//! | [`model`]   | nodes, links, elements, orientation                         |
//! | [`stream`]  | chunk sources, incremental frame parser, event stream       |
//! | [`layout`]  | layered placement over a petgraph graph                     |
//! | [`anchor`]  | which node side each connector attaches to                  |
//! | [`scene`]   | tag-addressed drawing and read-back on a [`canvas::CanvasBackend`] |
//! | [`session`] | per-request lifecycle, cancellation, supersession           |
//! | [`client`]  | HTTP request payloads and the streaming response source     |
//! | [`config`]  | environment configuration                                   |
//! | [`error`]   | error-code convention                                       |

pub mod anchor;
pub mod client;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod scene;
pub mod session;
pub mod stream;

pub use anchor::{Anchor, AnchorAssigner, AnchorPolicy};
pub use client::{Credentials, DiagramClient, Model, RequestPayload};
pub use config::ClientConfig;
pub use error::ErrorCode;
pub use layout::{Layout, LayoutConfig, LayoutEngine};
pub use model::{DiagramElement, Link, Node, Orientation, Position};
pub use scene::{SceneReconciler, StoredDiagram};
pub use session::{CancelToken, DiagramSession, SessionId, SessionManager, SessionOptions, SessionOutcome, SessionState};
pub use stream::{EventStream, FrameParser, StreamEvent};
