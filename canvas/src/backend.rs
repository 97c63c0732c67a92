//! The abstract drawing capability a host canvas exposes to the diagram pipeline.
//!
//! Primitives are addressed by an opaque [`Handle`]. Nothing outside the
//! backend keeps an index of handles: callers attach key/value tags to every
//! primitive they create and find them again with [`CanvasBackend::find_by_tag`].

#[cfg(test)]
#[path = "backend_test.rs"]
mod backend_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a primitive living on the canvas.
pub type Handle = Uuid;

/// A side of a node's geometry that a connector end attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Wire name, e.g. `"TOP"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "TOP",
            Self::Bottom => "BOTTOM",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a node primitive.
///
/// Deserialization is lenient: an unrecognized shape name falls back to
/// [`ShapeType::RoundedRectangle`] instead of failing the whole node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeType {
    Square,
    Ellipse,
    #[default]
    RoundedRectangle,
    Diamond,
    TriangleUp,
    TriangleDown,
    ParallelogramRight,
    ParallelogramLeft,
    EngineeringDatabase,
    EngineeringQueue,
    EngineeringFile,
    EngineeringDocument,
}

impl ShapeType {
    /// Wire name, e.g. `"ROUNDED_RECTANGLE"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "SQUARE",
            Self::Ellipse => "ELLIPSE",
            Self::RoundedRectangle => "ROUNDED_RECTANGLE",
            Self::Diamond => "DIAMOND",
            Self::TriangleUp => "TRIANGLE_UP",
            Self::TriangleDown => "TRIANGLE_DOWN",
            Self::ParallelogramRight => "PARALLELOGRAM_RIGHT",
            Self::ParallelogramLeft => "PARALLELOGRAM_LEFT",
            Self::EngineeringDatabase => "ENGINEERING_DATABASE",
            Self::EngineeringQueue => "ENGINEERING_QUEUE",
            Self::EngineeringFile => "ENGINEERING_FILE",
            Self::EngineeringDocument => "ENGINEERING_DOCUMENT",
        }
    }
}

impl From<String> for ShapeType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SQUARE" => Self::Square,
            "ELLIPSE" => Self::Ellipse,
            "DIAMOND" => Self::Diamond,
            "TRIANGLE_UP" => Self::TriangleUp,
            "TRIANGLE_DOWN" => Self::TriangleDown,
            "PARALLELOGRAM_RIGHT" => Self::ParallelogramRight,
            "PARALLELOGRAM_LEFT" => Self::ParallelogramLeft,
            "ENGINEERING_DATABASE" => Self::EngineeringDatabase,
            "ENGINEERING_QUEUE" => Self::EngineeringQueue,
            "ENGINEERING_FILE" => Self::EngineeringFile,
            "ENGINEERING_DOCUMENT" => Self::EngineeringDocument,
            _ => Self::RoundedRectangle,
        }
    }
}

impl From<ShapeType> for String {
    fn from(shape: ShapeType) -> Self {
        shape.as_str().to_owned()
    }
}

/// Errors a backend reports for a single operation.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// No primitive with this handle exists (never created, or already deleted).
    #[error("unknown primitive: {0}")]
    UnknownHandle(Handle),

    /// A connector endpoint refers to something that is not a node.
    #[error("primitive {0} is not a node")]
    NotANode(Handle),
}

/// Drawing capability of a host canvas.
///
/// Writes are issued sequentially by a single owner; implementations need no
/// internal synchronization.
pub trait CanvasBackend {
    /// Create a node shape carrying `label`. The new primitive is visible
    /// until told otherwise.
    ///
    /// # Errors
    ///
    /// Backend-specific; the in-memory store never fails here.
    fn create_node(&mut self, shape: ShapeType, label: &str) -> Result<Handle, CanvasError>;

    /// Create a connector between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownHandle`] or [`CanvasError::NotANode`] when
    /// either endpoint is not a live node.
    fn create_connector(
        &mut self,
        from: Handle,
        to: Handle,
        from_side: Side,
        to_side: Side,
        label: &str,
    ) -> Result<Handle, CanvasError>;

    /// Attach (or overwrite) an opaque key/value tag.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownHandle`] if the primitive does not exist.
    fn set_tag(&mut self, handle: Handle, key: &str, value: &str) -> Result<(), CanvasError>;

    /// Read a tag back. `None` when the primitive or the key is absent.
    fn get_tag(&self, handle: Handle, key: &str) -> Option<&str>;

    /// All live primitives whose tag `key` equals `value`, in creation order.
    fn find_by_tag(&self, key: &str, value: &str) -> Vec<Handle>;

    /// Remove a primitive from the document.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownHandle`] if the primitive does not exist.
    fn delete(&mut self, handle: Handle) -> Result<(), CanvasError>;

    /// Show or hide a primitive.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownHandle`] if the primitive does not exist.
    fn set_visible(&mut self, handle: Handle, visible: bool) -> Result<(), CanvasError>;

    /// Move a primitive's top-left corner to `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownHandle`] if the primitive does not exist.
    fn set_position(&mut self, handle: Handle, x: f64, y: f64) -> Result<(), CanvasError>;
}
