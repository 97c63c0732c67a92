//! Connector side assignment.
//!
//! Decides which side of each node a connector leaves from and arrives at,
//! given the finished layout. Rules, applied per edge in input order:
//!
//! - **Back-links.** When the reverse pair (or the same node, for a
//!   self-loop) has already been seen, both ends share one side perpendicular
//!   to the flow. A running counter alternates that side so parallel
//!   back-links fan out: TOP/BOTTOM for LR/RL, LEFT/RIGHT for TB/BT. The
//!   target end leaves its flow-facing side (LEFT for LR) on purpose, so a
//!   back-link never arrives on the side the forward connectors use.
//! - **Same rank.** Nodes in one rank are joined across the flow, facing each
//!   other (e.g. BOTTOM -> TOP when the target sits below in LR).
//! - **Forward.** The source leaves through the flow-facing side (RIGHT for
//!   LR) the first time; every later outgoing edge of that node falls back to
//!   the secondary side (BOTTOM for LR) so fan-out does not overlap. The
//!   target always receives on the side facing the flow (LEFT for LR).
//!
//! Under [`AnchorPolicy::Suggested`], side hints carried on the link override
//! the computed sides.

use std::collections::{HashMap, HashSet};

use canvas::Side;
use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::model::{DiagramElement, Orientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Sides come from layout geometry only.
    #[default]
    Computed,
    /// Link hints win where present; computed sides fill the gaps.
    Suggested,
}

/// Sides chosen for one connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub from_side: Side,
    pub to_side: Side,
}

/// Side vocabulary for one orientation.
struct FlowSides {
    out: Side,
    into: Side,
    fallback: Side,
    back_links: [Side; 2],
}

fn flow_sides(orientation: Orientation) -> FlowSides {
    match orientation {
        Orientation::LeftRight => FlowSides {
            out: Side::Right,
            into: Side::Left,
            fallback: Side::Bottom,
            back_links: [Side::Top, Side::Bottom],
        },
        Orientation::RightLeft => FlowSides {
            out: Side::Left,
            into: Side::Right,
            fallback: Side::Bottom,
            back_links: [Side::Top, Side::Bottom],
        },
        Orientation::TopBottom => FlowSides {
            out: Side::Bottom,
            into: Side::Top,
            fallback: Side::Right,
            back_links: [Side::Left, Side::Right],
        },
        Orientation::BottomTop => FlowSides {
            out: Side::Top,
            into: Side::Bottom,
            fallback: Side::Right,
            back_links: [Side::Left, Side::Right],
        },
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorAssigner {
    orientation: Orientation,
    policy: AnchorPolicy,
}

impl AnchorAssigner {
    #[must_use]
    pub fn new(orientation: Orientation, policy: AnchorPolicy) -> Self {
        Self { orientation, policy }
    }

    /// One anchor per edge, index-aligned with `edges`.
    #[must_use]
    pub fn assign(&self, edges: &[DiagramElement], layout: &Layout) -> Vec<Anchor> {
        let sides = flow_sides(self.orientation);
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut claimed: HashMap<&str, HashSet<Side>> = HashMap::new();
        let mut back_links = 0usize;

        edges
            .iter()
            .map(|edge| {
                let (from, to) = (edge.from.id.as_str(), edge.to.id.as_str());
                let back_link = edge.is_self_loop() || seen.contains(&(to, from));
                seen.insert((from, to));

                let computed = if back_link {
                    back_links += 1;
                    let side = sides.back_links[back_links % 2];
                    Anchor { from_side: side, to_side: side }
                } else if let Some(anchor) = self.same_rank(from, to, layout) {
                    anchor
                } else {
                    let used = claimed.entry(from).or_default();
                    let from_side = if used.contains(&sides.out) { sides.fallback } else { sides.out };
                    used.insert(from_side);
                    Anchor { from_side, to_side: sides.into }
                };

                match self.policy {
                    AnchorPolicy::Computed => computed,
                    AnchorPolicy::Suggested => Anchor {
                        from_side: edge.link.from_magnet.unwrap_or(computed.from_side),
                        to_side: edge.link.to_magnet.unwrap_or(computed.to_side),
                    },
                }
            })
            .collect()
    }

    /// Cross-flow pair for two distinct nodes sharing a rank.
    fn same_rank(&self, from: &str, to: &str, layout: &Layout) -> Option<Anchor> {
        if layout.rank(from)? != layout.rank(to)? {
            return None;
        }
        let (a, b) = (layout.position(from)?, layout.position(to)?);
        let anchor = if self.orientation.is_horizontal() {
            if b.y >= a.y {
                Anchor { from_side: Side::Bottom, to_side: Side::Top }
            } else {
                Anchor { from_side: Side::Top, to_side: Side::Bottom }
            }
        } else if b.x >= a.x {
            Anchor { from_side: Side::Right, to_side: Side::Left }
        } else {
            Anchor { from_side: Side::Left, to_side: Side::Right }
        };
        Some(anchor)
    }
}

#[cfg(test)]
#[path = "anchor_test.rs"]
mod tests;
