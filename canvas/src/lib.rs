//! Canvas seam for streamed diagrams.
//!
//! The diagram pipeline never talks to a host drawing surface directly. It
//! drives the [`backend::CanvasBackend`] capability instead: create shapes and
//! connectors, tag them with opaque key/value pairs, look them up again by
//! tag, position them, toggle their visibility and delete them. A real host
//! integration implements the trait; [`doc::DocStore`] is the in-memory
//! implementation used by the command-line driver and by tests.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`backend`] | The `CanvasBackend` trait and primitive-level types (`Handle`, `ShapeType`, `Side`) |
//! | [`doc`] | In-memory document store implementing the backend, with an operation journal |
//! | [`consts`] | Shared numeric constants (default node geometry) |

pub mod backend;
pub mod consts;
pub mod doc;

pub use backend::{CanvasBackend, CanvasError, Handle, ShapeType, Side};
pub use doc::{DocStore, Op, Primitive, PrimitiveKind};
