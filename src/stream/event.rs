//! Events produced by the frame parser and consumed by a diagram session.

use crate::model::DiagramElement;

/// One unit of progress extracted from the upstream byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Narration text for the status display.
    Message(String),
    /// Newly completed diagram elements, in arrival order.
    NodeBatch(Vec<DiagramElement>),
    /// Upstream finished normally.
    End,
    /// Upstream failed; the text is shown to the user as-is.
    Error(String),
}

impl StreamEvent {
    /// Short name for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::NodeBatch(_) => "node_batch",
            Self::End => "end",
            Self::Error(_) => "error",
        }
    }
}
