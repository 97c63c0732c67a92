//! Layered layout: diagram elements in, node positions out.
//!
//! DESIGN
//! ======
//! A small Sugiyama-style pass over a petgraph `DiGraph`:
//!
//! 1. Nodes are indexed in first-appearance order; self-loops add no edge.
//! 2. A depth-first search from every node (in index order) collects back
//!    edges; dropping them leaves a DAG.
//! 3. Each node's rank is its longest-path distance from a source.
//! 4. One barycenter sweep orders each rank by the mean slot of its
//!    predecessors; ties keep appearance order.
//! 5. Ranks advance along the primary axis (x for LR/RL, y for TB/BT) and
//!    each rank is centred on the cross axis.
//!
//! Every step is deterministic, so equal input gives bit-identical output.
//! Positions are top-left corners, never negative.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsEvent, depth_first_search};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ErrorCode;
use crate::model::{DiagramElement, Orientation, Position};

pub const DEFAULT_NODE_SPACING: f64 = 100.0;
pub const DEFAULT_RANK_SPACING: f64 = 100.0;
/// Extra gap between ranks per character of the longest edge label.
pub const DEFAULT_LABEL_CHAR_WIDTH: f64 = 7.0;
pub const DEFAULT_MAX_LABEL_WIDENING: f64 = 200.0;

// =============================================================================
// CONFIG
// =============================================================================

/// Geometry knobs. Defaults match the node size the canvas draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbours within a rank.
    pub node_spacing: f64,
    /// Gap between consecutive ranks, before label widening.
    pub rank_spacing: f64,
    pub label_char_width: f64,
    pub max_label_widening: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: canvas::consts::DEFAULT_NODE_WIDTH,
            node_height: canvas::consts::DEFAULT_NODE_HEIGHT,
            node_spacing: DEFAULT_NODE_SPACING,
            rank_spacing: DEFAULT_RANK_SPACING,
            label_char_width: DEFAULT_LABEL_CHAR_WIDTH,
            max_label_widening: DEFAULT_MAX_LABEL_WIDENING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Back-edge removal left a cycle behind. Indicates a bug in layering.
    #[error("layering failed: cycle through node '{0}'")]
    Cyclic(String),
}

impl ErrorCode for LayoutError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cyclic(_) => "E_LAYOUT_CYCLIC",
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Placement of every node referenced by the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub orientation: Orientation,
    positions: BTreeMap<String, Position>,
    ranks: BTreeMap<String, usize>,
}

impl Layout {
    #[must_use]
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    #[must_use]
    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    #[must_use]
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Position every node referenced by `edges`.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Cyclic`] if the graph is still cyclic after back-edge
    /// removal, which cannot happen for well-formed input.
    pub fn layout(&self, edges: &[DiagramElement], orientation: Orientation) -> Result<Layout, LayoutError> {
        let mut graph = DiGraph::<&str, ()>::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();
        for edge in edges {
            let from = *index
                .entry(edge.from.id.as_str())
                .or_insert_with(|| graph.add_node(edge.from.id.as_str()));
            let to = *index
                .entry(edge.to.id.as_str())
                .or_insert_with(|| graph.add_node(edge.to.id.as_str()));
            if from != to {
                graph.add_edge(from, to, ());
            }
        }
        if graph.node_count() == 0 {
            return Ok(Layout { orientation, ..Layout::default() });
        }

        let dag = remove_back_edges(&graph);
        let ranks = longest_path_ranks(&dag)?;
        let layers = order_layers(&dag, &ranks);
        let positions = self.place(&dag, &layers, orientation, longest_label(edges));

        debug!(nodes = dag.node_count(), ranks = layers.len(), %orientation, "layout: placed nodes");

        let ranks = dag
            .node_indices()
            .map(|n| (dag[n].to_owned(), ranks[n.index()]))
            .collect();
        Ok(Layout { orientation, positions, ranks })
    }

    #[allow(clippy::cast_precision_loss)]
    fn place(
        &self,
        dag: &DiGraph<&str, ()>,
        layers: &[Vec<NodeIndex>],
        orientation: Orientation,
        longest_label: usize,
    ) -> BTreeMap<String, Position> {
        let cfg = &self.config;
        let (primary_extent, cross_extent) = if orientation.is_horizontal() {
            (cfg.node_width, cfg.node_height)
        } else {
            (cfg.node_height, cfg.node_width)
        };
        let widening = (longest_label as f64 * cfg.label_char_width).min(cfg.max_label_widening);
        let primary_step = primary_extent + cfg.rank_spacing + widening;
        let cross_step = cross_extent + cfg.node_spacing;
        let widest = layers.iter().map(Vec::len).max().unwrap_or(0);
        let last_rank = layers.len().saturating_sub(1);

        let mut positions = BTreeMap::new();
        for (rank, layer) in layers.iter().enumerate() {
            let slot_rank = if orientation.is_reversed() { last_rank - rank } else { rank };
            let primary = slot_rank as f64 * primary_step;
            let offset = (widest - layer.len()) as f64 * cross_step / 2.0;
            for (slot, &node) in layer.iter().enumerate() {
                let cross = offset + slot as f64 * cross_step;
                let (x, y) = if orientation.is_horizontal() { (primary, cross) } else { (cross, primary) };
                positions.insert(dag[node].to_owned(), Position { x, y });
            }
        }
        positions
    }
}

// =============================================================================
// LAYERING
// =============================================================================

fn remove_back_edges<'a>(graph: &DiGraph<&'a str, ()>) -> DiGraph<&'a str, ()> {
    let mut back_edges = HashSet::new();
    depth_first_search(graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });
    graph.filter_map(
        |_, id| Some(*id),
        |edge, _| {
            let (u, v) = graph.edge_endpoints(edge)?;
            (!back_edges.contains(&(u, v))).then_some(())
        },
    )
}

fn longest_path_ranks(dag: &DiGraph<&str, ()>) -> Result<Vec<usize>, LayoutError> {
    let order = toposort(dag, None).map_err(|cycle| LayoutError::Cyclic(dag[cycle.node_id()].to_owned()))?;
    let mut ranks = vec![0usize; dag.node_count()];
    for node in order {
        let next = ranks[node.index()] + 1;
        for succ in dag.neighbors_directed(node, Direction::Outgoing) {
            ranks[succ.index()] = ranks[succ.index()].max(next);
        }
    }
    Ok(ranks)
}

/// Group nodes by rank, then order each rank by predecessor barycenter.
#[allow(clippy::cast_precision_loss)]
fn order_layers(dag: &DiGraph<&str, ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.iter().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); depth];
    for node in dag.node_indices() {
        layers[ranks[node.index()]].push(node);
    }

    let mut slot = vec![0usize; dag.node_count()];
    for layer in &mut layers {
        let mut keyed: Vec<(f64, usize, NodeIndex)> = layer
            .iter()
            .enumerate()
            .map(|(i, &node)| {
                let preds: Vec<usize> = dag
                    .neighbors_directed(node, Direction::Incoming)
                    .map(|p| slot[p.index()])
                    .collect();
                let center = if preds.is_empty() {
                    i as f64
                } else {
                    preds.iter().sum::<usize>() as f64 / preds.len() as f64
                };
                (center, i, node)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        *layer = keyed.into_iter().map(|(_, _, node)| node).collect();
        for (i, node) in layer.iter().enumerate() {
            slot[node.index()] = i;
        }
    }
    layers
}

fn longest_label(edges: &[DiagramElement]) -> usize {
    edges
        .iter()
        .map(|e| e.link.caption().chars().count())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
