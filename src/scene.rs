//! Scene reconciliation: turn a laid-out diagram into canvas primitives.
//!
//! Every primitive a session draws carries a `diagramId` tag. That tag is the
//! only handle the pipeline keeps on the canvas: a redraw finds the previous
//! frame's primitives by tag, deletes them, and draws the new frame.
//!
//! Draw order per frame:
//!
//! 1. verify every referenced node has a position (no canvas writes otherwise)
//! 2. delete primitives tagged with this diagram id
//! 3. create each distinct node once, then one connector per element, all hidden
//! 4. position and tag everything
//! 5. reveal everything
//!
//! Tags written:
//!
//! | key           | on          | value                                    |
//! |---------------|-------------|------------------------------------------|
//! | `diagramId`   | all         | owning session id                        |
//! | `nodeId`      | nodes       | logical node id                          |
//! | `diagramData` | all         | JSON of the element list that was drawn  |
//! | `isRoot`      | first node  | `"true"`                                 |

use std::collections::HashMap;

use canvas::{CanvasBackend, CanvasError, Handle};
use serde::Serialize;
use tracing::{debug, info};

use crate::anchor::Anchor;
use crate::error::ErrorCode;
use crate::layout::Layout;
use crate::model::{DiagramElement, Node};

pub const TAG_DIAGRAM_ID: &str = "diagramId";
pub const TAG_NODE_ID: &str = "nodeId";
pub const TAG_DIAGRAM_DATA: &str = "diagramData";
pub const TAG_IS_ROOT: &str = "isRoot";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The layout has no position for a node the elements reference.
    #[error("no position for node '{0}'")]
    MissingPosition(String),

    #[error("{anchors} anchors supplied for {edges} elements")]
    AnchorMismatch { edges: usize, anchors: usize },

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error("diagram data encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ErrorCode for SceneError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingPosition(_) => "E_SCENE_MISSING_POSITION",
            Self::AnchorMismatch { .. } => "E_SCENE_ANCHOR_MISMATCH",
            Self::Canvas(err) => err.error_code(),
            Self::Encode(_) => "E_SCENE_ENCODE",
        }
    }
}

// =============================================================================
// RECONCILER
// =============================================================================

/// What one draw pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrawReport {
    pub deleted: usize,
    pub nodes: Vec<Handle>,
    pub connectors: Vec<Handle>,
}

/// Redraws a whole diagram per pass: everything tagged with the diagram id
/// is deleted, then drawn again from the current element list.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneReconciler;

impl SceneReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Delete every primitive tagged with `diagram_id`. Returns how many went.
    ///
    /// # Errors
    ///
    /// Propagates the first backend failure.
    pub fn clear<C: CanvasBackend + ?Sized>(&self, canvas: &mut C, diagram_id: &str) -> Result<usize, SceneError> {
        let handles = canvas.find_by_tag(TAG_DIAGRAM_ID, diagram_id);
        for &handle in &handles {
            canvas.delete(handle)?;
        }
        if !handles.is_empty() {
            debug!(diagram_id, deleted = handles.len(), "scene: cleared previous frame");
        }
        Ok(handles.len())
    }

    /// Draw `edges` for `diagram_id` using precomputed positions and sides.
    ///
    /// # Errors
    ///
    /// [`SceneError::MissingPosition`] and [`SceneError::AnchorMismatch`] are
    /// raised before anything is written. Backend failures abort mid-pass.
    pub fn draw<C: CanvasBackend + ?Sized>(
        &self,
        canvas: &mut C,
        diagram_id: &str,
        edges: &[DiagramElement],
        layout: &Layout,
        anchors: &[Anchor],
    ) -> Result<DrawReport, SceneError> {
        if anchors.len() != edges.len() {
            return Err(SceneError::AnchorMismatch { edges: edges.len(), anchors: anchors.len() });
        }
        if let Some(missing) = edges
            .iter()
            .flat_map(|e| [&e.from, &e.to])
            .find(|n| layout.position(&n.id).is_none())
        {
            return Err(SceneError::MissingPosition(missing.id.clone()));
        }
        let diagram_data = serde_json::to_string(edges)?;

        let deleted = self.clear(canvas, diagram_id)?;

        let mut nodes: Vec<(&Node, Handle)> = Vec::new();
        let mut by_id: HashMap<&str, Handle> = HashMap::new();
        for node in edges.iter().flat_map(|e| [&e.from, &e.to]) {
            if by_id.contains_key(node.id.as_str()) {
                continue;
            }
            let handle = canvas.create_node(node.shape, &node.label)?;
            canvas.set_visible(handle, false)?;
            by_id.insert(node.id.as_str(), handle);
            nodes.push((node, handle));
        }

        let mut connectors = Vec::with_capacity(edges.len());
        for (edge, anchor) in edges.iter().zip(anchors) {
            let from = by_id[edge.from.id.as_str()];
            let to = by_id[edge.to.id.as_str()];
            let handle = canvas.create_connector(from, to, anchor.from_side, anchor.to_side, edge.link.caption())?;
            canvas.set_visible(handle, false)?;
            connectors.push(handle);
        }

        for (i, (node, handle)) in nodes.iter().enumerate() {
            if let Some(pos) = layout.position(&node.id) {
                canvas.set_position(*handle, pos.x, pos.y)?;
            }
            canvas.set_tag(*handle, TAG_DIAGRAM_ID, diagram_id)?;
            canvas.set_tag(*handle, TAG_NODE_ID, &node.id)?;
            canvas.set_tag(*handle, TAG_DIAGRAM_DATA, &diagram_data)?;
            if i == 0 {
                canvas.set_tag(*handle, TAG_IS_ROOT, "true")?;
            }
        }
        for &handle in &connectors {
            canvas.set_tag(handle, TAG_DIAGRAM_ID, diagram_id)?;
            canvas.set_tag(handle, TAG_DIAGRAM_DATA, &diagram_data)?;
        }

        for &handle in nodes.iter().map(|(_, h)| h).chain(&connectors) {
            canvas.set_visible(handle, true)?;
        }

        info!(diagram_id, nodes = nodes.len(), connectors = connectors.len(), deleted, "scene: frame drawn");
        Ok(DrawReport { deleted, nodes: nodes.into_iter().map(|(_, h)| h).collect(), connectors })
    }
}

// =============================================================================
// READING BACK
// =============================================================================

/// A diagram recovered from the tags on one of its primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDiagram {
    pub diagram_id: String,
    /// Logical id of the node the read started from; `None` for a connector.
    pub node_id: Option<String>,
    pub edges: Vec<DiagramElement>,
}

/// Recover the diagram a primitive belongs to. `None` when the primitive
/// carries no diagram tags.
///
/// # Errors
///
/// [`SceneError::Encode`] when the stored element list is not valid JSON.
pub fn stored_diagram<C: CanvasBackend + ?Sized>(canvas: &C, handle: Handle) -> Result<Option<StoredDiagram>, SceneError> {
    let (Some(diagram_id), Some(data)) = (canvas.get_tag(handle, TAG_DIAGRAM_ID), canvas.get_tag(handle, TAG_DIAGRAM_DATA))
    else {
        return Ok(None);
    };
    let edges: Vec<DiagramElement> = serde_json::from_str(data)?;
    Ok(Some(StoredDiagram {
        diagram_id: diagram_id.to_owned(),
        node_id: canvas.get_tag(handle, TAG_NODE_ID).map(str::to_owned),
        edges,
    }))
}

/// Handle of the node with logical id `node_id` inside `diagram_id`.
#[must_use]
pub fn find_node<C: CanvasBackend + ?Sized>(canvas: &C, diagram_id: &str, node_id: &str) -> Option<Handle> {
    canvas
        .find_by_tag(TAG_NODE_ID, node_id)
        .into_iter()
        .find(|&h| canvas.get_tag(h, TAG_DIAGRAM_ID) == Some(diagram_id))
}

/// Root node of the most recently drawn diagram on the canvas.
#[must_use]
pub fn latest_root<C: CanvasBackend + ?Sized>(canvas: &C) -> Option<Handle> {
    canvas.find_by_tag(TAG_IS_ROOT, "true").pop()
}

#[cfg(test)]
#[path = "scene_test.rs"]
mod tests;
