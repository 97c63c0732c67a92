use super::*;
use crate::layout::LayoutEngine;
use crate::model::{Link, Node};

fn edge(from: &str, to: &str) -> DiagramElement {
    DiagramElement {
        from: Node { id: from.into(), label: String::new(), shape: canvas::ShapeType::default() },
        link: Link::default(),
        to: Node { id: to.into(), label: String::new(), shape: canvas::ShapeType::default() },
    }
}

fn assign(edges: &[DiagramElement], orientation: Orientation, policy: AnchorPolicy) -> Vec<Anchor> {
    let layout = LayoutEngine::default().layout(edges, orientation).unwrap();
    AnchorAssigner::new(orientation, policy).assign(edges, &layout)
}

fn pair(from_side: Side, to_side: Side) -> Anchor {
    Anchor { from_side, to_side }
}

#[test]
fn chain_left_to_right_uses_right_then_left() {
    let edges = vec![edge("a", "b"), edge("b", "c")];
    let anchors = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(anchors, vec![pair(Side::Right, Side::Left), pair(Side::Right, Side::Left)]);
}

#[test]
fn forward_sides_follow_orientation() {
    let edges = vec![edge("a", "b")];
    let cases = [
        (Orientation::LeftRight, pair(Side::Right, Side::Left)),
        (Orientation::RightLeft, pair(Side::Left, Side::Right)),
        (Orientation::TopBottom, pair(Side::Bottom, Side::Top)),
        (Orientation::BottomTop, pair(Side::Top, Side::Bottom)),
    ];
    for (orientation, expected) in cases {
        assert_eq!(assign(&edges, orientation, AnchorPolicy::Computed), vec![expected], "{orientation}");
    }
}

#[test]
fn second_outgoing_edge_falls_back_to_secondary_side() {
    let edges = vec![edge("a", "b"), edge("a", "c"), edge("a", "d")];
    let lr = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(lr[0].from_side, Side::Right);
    assert_eq!(lr[1].from_side, Side::Bottom);
    assert_eq!(lr[2].from_side, Side::Bottom);
    assert!(lr.iter().all(|a| a.to_side == Side::Left));

    let tb = assign(&edges, Orientation::TopBottom, AnchorPolicy::Computed);
    assert_eq!(tb[0].from_side, Side::Bottom);
    assert_eq!(tb[1].from_side, Side::Right);
}

#[test]
fn back_links_alternate_starting_with_bottom() {
    let edges = vec![edge("a", "b"), edge("b", "a"), edge("b", "c"), edge("c", "b"), edge("c", "a"), edge("a", "c")];
    let anchors = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(anchors[1], pair(Side::Bottom, Side::Bottom));
    assert_eq!(anchors[3], pair(Side::Top, Side::Top));
    assert_eq!(anchors[5], pair(Side::Bottom, Side::Bottom));
    // Back-links never land on the flow-facing side the forward links use.
    assert!(anchors.iter().skip(1).step_by(2).all(|a| a.to_side != Side::Left));
}

#[test]
fn back_links_in_vertical_flow_use_left_and_right() {
    let edges = vec![edge("a", "b"), edge("b", "a"), edge("b", "c"), edge("c", "b")];
    let anchors = assign(&edges, Orientation::TopBottom, AnchorPolicy::Computed);
    assert_eq!(anchors[1], pair(Side::Right, Side::Right));
    assert_eq!(anchors[3], pair(Side::Left, Side::Left));
}

#[test]
fn self_loop_is_a_back_link() {
    let anchors = assign(&[edge("a", "a")], Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(anchors, vec![pair(Side::Bottom, Side::Bottom)]);
}

#[test]
fn same_rank_nodes_face_each_other() {
    // b and c share rank 1; the b -> c edge crosses the flow.
    let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c"), edge("c", "d"), edge("b", "d")];
    let layout = LayoutEngine::default().layout(&edges[..2], Orientation::LeftRight).unwrap();
    let anchors = AnchorAssigner::new(Orientation::LeftRight, AnchorPolicy::Computed).assign(&edges[..3], &layout);
    assert_eq!(anchors[2], pair(Side::Bottom, Side::Top));

    let reverse = vec![edge("a", "b"), edge("a", "c"), edge("c", "b")];
    let anchors = AnchorAssigner::new(Orientation::LeftRight, AnchorPolicy::Computed).assign(&reverse, &layout);
    assert_eq!(anchors[2], pair(Side::Top, Side::Bottom));
}

#[test]
fn suggested_policy_honours_hints_and_fills_gaps() {
    let mut hinted = edge("a", "b");
    hinted.link.from_magnet = Some(Side::Top);
    let mut half = edge("a", "c");
    half.link.to_magnet = Some(Side::Bottom);
    let edges = vec![hinted, half];

    let suggested = assign(&edges, Orientation::LeftRight, AnchorPolicy::Suggested);
    assert_eq!(suggested[0], pair(Side::Top, Side::Left));
    assert_eq!(suggested[1], pair(Side::Bottom, Side::Bottom));

    let computed = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(computed[0], pair(Side::Right, Side::Left));
}

#[test]
fn assignment_is_deterministic() {
    let edges = crate::stream::sample_sign_up_flow();
    let first = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    let second = assign(&edges, Orientation::LeftRight, AnchorPolicy::Computed);
    assert_eq!(first, second);
    assert_eq!(first.len(), edges.len());
}
