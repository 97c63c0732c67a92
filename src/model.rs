//! Diagram data model shared by the parser, layout, and scene stages.
//!
//! A diagram is an ordered list of [`DiagramElement`]s, each one a directed
//! edge `from -> to` carrying an optional label. Node identity is the `id`
//! string; the same node usually appears in several elements and is drawn once.

use std::fmt;
use std::str::FromStr;

use canvas::{ShapeType, Side};
use serde::{Deserialize, Serialize};

// =============================================================================
// NODES AND LINKS
// =============================================================================

/// A diagram node as described by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub shape: ShapeType,
}

/// Edge annotation between two nodes.
///
/// `from_magnet` / `to_magnet` are side hints the model may attach; they are
/// only honoured under [`crate::anchor::AnchorPolicy::Suggested`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_magnet: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_magnet: Option<Side>,
}

impl Link {
    /// Text drawn on the connector: the label, or the condition when the
    /// label is empty.
    #[must_use]
    pub fn caption(&self) -> &str {
        if self.label.is_empty() {
            self.condition.as_deref().unwrap_or("")
        } else {
            &self.label
        }
    }
}

/// One directed edge of the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramElement {
    pub from: Node,
    #[serde(default)]
    pub link: Link,
    pub to: Node,
}

impl DiagramElement {
    /// `true` when both ends are the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from.id == self.to.id
    }
}

/// Top-left corner of a node's bounding box in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// ORIENTATION
// =============================================================================

/// Direction in which successive ranks of the diagram are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "TB", alias = "TD")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl Orientation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }

    /// `true` when ranks advance along the x axis.
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    /// `true` when later ranks sit at smaller coordinates (right-to-left, bottom-to-top).
    #[must_use]
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::RightLeft | Self::BottomTop)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for an orientation string outside `TB`, `TD`, `BT`, `LR`, `RL`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown orientation '{0}' (expected TB, TD, BT, LR or RL)")]
pub struct UnknownOrientation(pub String);

impl FromStr for Orientation {
    type Err = UnknownOrientation;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Self::TopBottom),
            "BT" => Ok(Self::BottomTop),
            "LR" => Ok(Self::LeftRight),
            "RL" => Ok(Self::RightLeft),
            _ => Err(UnknownOrientation(raw.to_owned())),
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
