#![allow(clippy::float_cmp)]

use super::*;

fn two_nodes(store: &mut DocStore) -> (Handle, Handle) {
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    let b = store.create_node(ShapeType::Diamond, "B").unwrap();
    (a, b)
}

// =============================================================
// Creation
// =============================================================

#[test]
fn new_store_is_empty() {
    let store = DocStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(store.journal().is_empty());
}

#[test]
fn default_equals_new() {
    let store = DocStore::default();
    assert!(store.is_empty());
}

#[test]
fn create_node_uses_default_geometry_and_is_visible() {
    let mut store = DocStore::new();
    let id = store.create_node(ShapeType::Ellipse, "Start").unwrap();
    let node = store.get(&id).unwrap();
    assert!(node.is_node());
    assert!(node.visible);
    assert_eq!(node.width, DEFAULT_NODE_WIDTH);
    assert_eq!(node.height, DEFAULT_NODE_HEIGHT);
    assert_eq!(node.kind, PrimitiveKind::Shape { shape: ShapeType::Ellipse, label: "Start".into() });
    assert_eq!(store.journal(), &[Op::CreateNode(id)]);
}

#[test]
fn create_connector_links_two_nodes() {
    let mut store = DocStore::new();
    let (a, b) = two_nodes(&mut store);
    let c = store
        .create_connector(a, b, Side::Right, Side::Left, "next")
        .unwrap();
    let conn = store.get(&c).unwrap();
    assert!(!conn.is_node());
    match &conn.kind {
        PrimitiveKind::Connector { start, end, label } => {
            assert_eq!(start.handle, a);
            assert_eq!(start.magnet, Side::Right);
            assert_eq!(end.handle, b);
            assert_eq!(end.magnet, Side::Left);
            assert_eq!(label, "next");
        }
        PrimitiveKind::Shape { .. } => panic!("expected connector"),
    }
}

#[test]
fn create_connector_rejects_unknown_endpoint() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    let ghost = Uuid::new_v4();
    let err = store
        .create_connector(a, ghost, Side::Right, Side::Left, "")
        .unwrap_err();
    assert!(matches!(err, CanvasError::UnknownHandle(h) if h == ghost));
}

#[test]
fn create_connector_rejects_connector_endpoint() {
    let mut store = DocStore::new();
    let (a, b) = two_nodes(&mut store);
    let c = store
        .create_connector(a, b, Side::Right, Side::Left, "")
        .unwrap();
    let err = store
        .create_connector(a, c, Side::Right, Side::Left, "")
        .unwrap_err();
    assert!(matches!(err, CanvasError::NotANode(h) if h == c));
}

// =============================================================
// Tags
// =============================================================

#[test]
fn set_and_get_tag() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.set_tag(a, "diagramId", "s1").unwrap();
    assert_eq!(store.get_tag(a, "diagramId"), Some("s1"));
    assert_eq!(store.get_tag(a, "missing"), None);
    assert_eq!(store.get_tag(Uuid::new_v4(), "diagramId"), None);
}

#[test]
fn set_tag_overwrites() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.set_tag(a, "k", "1").unwrap();
    store.set_tag(a, "k", "2").unwrap();
    assert_eq!(store.get_tag(a, "k"), Some("2"));
}

#[test]
fn set_tag_unknown_handle_errors() {
    let mut store = DocStore::new();
    assert!(store.set_tag(Uuid::new_v4(), "k", "v").is_err());
}

#[test]
fn find_by_tag_returns_creation_order() {
    let mut store = DocStore::new();
    let (a, b) = two_nodes(&mut store);
    let other = store.create_node(ShapeType::Square, "X").unwrap();
    store.set_tag(b, "diagramId", "s1").unwrap();
    store.set_tag(a, "diagramId", "s1").unwrap();
    store.set_tag(other, "diagramId", "s2").unwrap();
    assert_eq!(store.find_by_tag("diagramId", "s1"), vec![a, b]);
    assert_eq!(store.find_by_tag("diagramId", "s2"), vec![other]);
    assert!(store.find_by_tag("diagramId", "s3").is_empty());
}

// =============================================================
// Delete / visibility / position
// =============================================================

#[test]
fn delete_removes_primitive() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.delete(a).unwrap();
    assert!(store.get(&a).is_none());
    assert!(store.is_empty());
    assert!(matches!(store.delete(a), Err(CanvasError::UnknownHandle(_))));
}

#[test]
fn set_visible_toggles() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.set_visible(a, false).unwrap();
    assert!(!store.get(&a).unwrap().visible);
    store.set_visible(a, true).unwrap();
    assert!(store.get(&a).unwrap().visible);
}

#[test]
fn set_position_moves() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.set_position(a, 40.0, -12.5).unwrap();
    let node = store.get(&a).unwrap();
    assert_eq!(node.x, 40.0);
    assert_eq!(node.y, -12.5);
}

#[test]
fn journal_records_every_call_in_order() {
    let mut store = DocStore::new();
    let a = store.create_node(ShapeType::Square, "A").unwrap();
    store.set_visible(a, false).unwrap();
    store.set_position(a, 1.0, 2.0).unwrap();
    store.set_tag(a, "k", "v").unwrap();
    store.delete(a).unwrap();
    assert_eq!(
        store.journal(),
        &[
            Op::CreateNode(a),
            Op::SetVisible(a, false),
            Op::SetPosition(a),
            Op::SetTag { handle: a, key: "k".into(), value: "v".into() },
            Op::Delete(a),
        ]
    );
    store.clear_journal();
    assert!(store.journal().is_empty());
}

#[test]
fn failed_calls_are_not_journaled() {
    let mut store = DocStore::new();
    assert!(store.set_visible(Uuid::new_v4(), true).is_err());
    assert!(store.journal().is_empty());
}

// =============================================================
// Snapshots
// =============================================================

#[test]
fn sorted_objects_follow_creation_order() {
    let mut store = DocStore::new();
    let (a, b) = two_nodes(&mut store);
    let ids: Vec<Handle> = store.sorted_objects().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn snapshot_serde_and_reload() {
    let mut store = DocStore::new();
    let (a, b) = two_nodes(&mut store);
    store
        .create_connector(a, b, Side::Bottom, Side::Top, "go")
        .unwrap();
    store.set_tag(a, "nodeId", "start").unwrap();

    let json = serde_json::to_string(&store.snapshot()).unwrap();
    let primitives: Vec<Primitive> = serde_json::from_str(&json).unwrap();

    let mut reloaded = DocStore::new();
    reloaded.load_snapshot(primitives);
    assert_eq!(reloaded.len(), 3);
    assert!(reloaded.journal().is_empty());
    assert_eq!(reloaded.find_by_tag("nodeId", "start"), vec![a]);

    // New primitives stack above the reloaded ones.
    let c = reloaded.create_node(ShapeType::Square, "C").unwrap();
    let last = reloaded.sorted_objects().last().map(|p| p.id);
    assert_eq!(last, Some(c));
}

#[test]
fn load_snapshot_replaces_contents() {
    let mut store = DocStore::new();
    store.create_node(ShapeType::Square, "old").unwrap();
    store.load_snapshot(Vec::new());
    assert!(store.is_empty());
}
