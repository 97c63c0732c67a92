//! Document model: canvas primitives and the in-memory store.
//!
//! This module defines what lives on the canvas (`Primitive`, `PrimitiveKind`)
//! and the runtime store that owns all live primitives (`DocStore`). The store
//! implements [`CanvasBackend`] so the diagram pipeline can draw into it exactly
//! as it would into a host canvas, and it records every backend call in an
//! operation journal (`Op`) so callers can assert on the exact sequence of
//! writes a draw pass issued.
//!
//! Snapshots are plain serde values: the command-line driver saves a document
//! as JSON and loads it back with `load_snapshot`.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{CanvasBackend, CanvasError, Handle, ShapeType, Side};
use crate::consts::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};

/// One end of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Node the connector end is attached to.
    pub handle: Handle,
    /// Side of that node the end attaches to.
    pub magnet: Side,
}

/// What a primitive is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// A node shape with a text label.
    Shape { shape: ShapeType, label: String },
    /// A connector between two nodes, optionally labelled.
    Connector { start: Endpoint, end: Endpoint, label: String },
}

/// A primitive as stored in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primitive {
    /// Unique handle of this primitive.
    pub id: Handle,
    /// Shape or connector.
    pub kind: PrimitiveKind,
    /// Left edge of the bounding box in canvas coordinates.
    pub x: f64,
    /// Top edge of the bounding box in canvas coordinates.
    pub y: f64,
    /// Width of the bounding box. Zero for connectors.
    pub width: f64,
    /// Height of the bounding box. Zero for connectors.
    pub height: f64,
    /// Whether the primitive is currently shown.
    pub visible: bool,
    /// Creation order; lower values were created earlier and draw beneath.
    pub z_index: i64,
    /// Opaque key/value tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Primitive {
    /// Returns `true` for node shapes.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Shape { .. })
    }
}

/// One backend call, as recorded in the journal.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    CreateNode(Handle),
    CreateConnector(Handle),
    SetTag { handle: Handle, key: String, value: String },
    Delete(Handle),
    SetVisible(Handle, bool),
    SetPosition(Handle),
}


/// In-memory canvas document.
pub struct DocStore {
    objects: HashMap<Handle, Primitive>,
    journal: Vec<Op>,
    next_z: i64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: HashMap::new(), journal: Vec::new(), next_z: 0 }
    }

    /// Return a reference to a primitive by handle.
    #[must_use]
    pub fn get(&self, id: &Handle) -> Option<&Primitive> {
        self.objects.get(id)
    }

    /// Replace all primitives with a full snapshot. Clears the journal.
    pub fn load_snapshot(&mut self, primitives: Vec<Primitive>) {
        self.objects.clear();
        self.journal.clear();
        self.next_z = primitives.iter().map(|p| p.z_index + 1).max().unwrap_or(0);
        for primitive in primitives {
            self.objects.insert(primitive.id, primitive);
        }
    }

    /// Return all primitives sorted by `(z_index, id)`.
    #[must_use]
    pub fn sorted_objects(&self) -> Vec<&Primitive> {
        let mut objs: Vec<&Primitive> = self.objects.values().collect();
        objs.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        objs
    }

    /// Clone of every primitive in draw order, ready to serialize.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Primitive> {
        self.sorted_objects().into_iter().cloned().collect()
    }

    /// Every backend call issued since creation or the last [`Self::clear_journal`].
    #[must_use]
    pub fn journal(&self) -> &[Op] {
        &self.journal
    }

    /// Forget the recorded operations; the document itself is untouched.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Number of primitives currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the store contains no primitives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn insert_new(&mut self, kind: PrimitiveKind, width: f64, height: f64) -> Handle {
        let id = Uuid::new_v4();
        let z_index = self.next_z;
        self.next_z += 1;
        self.objects.insert(
            id,
            Primitive { id, kind, x: 0.0, y: 0.0, width, height, visible: true, z_index, tags: BTreeMap::new() },
        );
        id
    }

    fn get_mut(&mut self, handle: Handle) -> Result<&mut Primitive, CanvasError> {
        self.objects
            .get_mut(&handle)
            .ok_or(CanvasError::UnknownHandle(handle))
    }

    fn require_node(&self, handle: Handle) -> Result<(), CanvasError> {
        match self.objects.get(&handle) {
            None => Err(CanvasError::UnknownHandle(handle)),
            Some(p) if !p.is_node() => Err(CanvasError::NotANode(handle)),
            Some(_) => Ok(()),
        }
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasBackend for DocStore {
    fn create_node(&mut self, shape: ShapeType, label: &str) -> Result<Handle, CanvasError> {
        let kind = PrimitiveKind::Shape { shape, label: label.to_owned() };
        let id = self.insert_new(kind, DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT);
        self.journal.push(Op::CreateNode(id));
        Ok(id)
    }

    fn create_connector(
        &mut self,
        from: Handle,
        to: Handle,
        from_side: Side,
        to_side: Side,
        label: &str,
    ) -> Result<Handle, CanvasError> {
        self.require_node(from)?;
        self.require_node(to)?;
        let kind = PrimitiveKind::Connector {
            start: Endpoint { handle: from, magnet: from_side },
            end: Endpoint { handle: to, magnet: to_side },
            label: label.to_owned(),
        };
        let id = self.insert_new(kind, 0.0, 0.0);
        self.journal.push(Op::CreateConnector(id));
        Ok(id)
    }

    fn set_tag(&mut self, handle: Handle, key: &str, value: &str) -> Result<(), CanvasError> {
        self.get_mut(handle)?
            .tags
            .insert(key.to_owned(), value.to_owned());
        self.journal
            .push(Op::SetTag { handle, key: key.to_owned(), value: value.to_owned() });
        Ok(())
    }

    fn get_tag(&self, handle: Handle, key: &str) -> Option<&str> {
        self.objects
            .get(&handle)
            .and_then(|p| p.tags.get(key))
            .map(String::as_str)
    }

    fn find_by_tag(&self, key: &str, value: &str) -> Vec<Handle> {
        self.sorted_objects()
            .into_iter()
            .filter(|p| p.tags.get(key).is_some_and(|v| v == value))
            .map(|p| p.id)
            .collect()
    }

    fn delete(&mut self, handle: Handle) -> Result<(), CanvasError> {
        self.objects
            .remove(&handle)
            .ok_or(CanvasError::UnknownHandle(handle))?;
        self.journal.push(Op::Delete(handle));
        Ok(())
    }

    fn set_visible(&mut self, handle: Handle, visible: bool) -> Result<(), CanvasError> {
        self.get_mut(handle)?.visible = visible;
        self.journal.push(Op::SetVisible(handle, visible));
        Ok(())
    }

    fn set_position(&mut self, handle: Handle, x: f64, y: f64) -> Result<(), CanvasError> {
        let primitive = self.get_mut(handle)?;
        primitive.x = x;
        primitive.y = y;
        self.journal.push(Op::SetPosition(handle));
        Ok(())
    }
}
