//! Layout and connector geometry.
//!
//! All of these values are ephemeral: recomputed on every pass from the
//! merged graph, the rank table, and measured node geometry.

use serde::{Deserialize, Serialize};

use crate::progress::UnlockState;
use crate::skill::{Branch, SkillId};

/// A point in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Measured bounding box of a materialized node, as reported by the
/// rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Finite coordinates and non-negative size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Outgoing connector anchor.
    pub fn right_center(&self) -> Point {
        Point {
            x: self.x + self.width,
            y: self.y + self.height / 2.0,
        }
    }

    /// Incoming connector anchor.
    pub fn left_center(&self) -> Point {
        Point {
            x: self.x,
            y: self.y + self.height / 2.0,
        }
    }
}

/// Placement of one node: its lane, its slot within the lane, and (once
/// measured) its concrete geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    pub node_id: SkillId,
    pub lane: Branch,
    pub lane_index: usize,
    pub order_within_lane: usize,
    /// Longest prerequisite chain below this node (0 for roots).
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
}

/// A lane and the ordered ids it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub branch: Branch,
    pub nodes: Vec<SkillId>,
}

/// Path shape used for connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStyle {
    Straight,
    Orthogonal,
    #[default]
    Curved,
}

/// Geometry of a routed connector.
///
/// `points` holds the anchors and bends (or, for curves, the anchors and the
/// two control points); `svg_path` is the same path as an SVG `d` attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathGeometry {
    pub style: ConnectorStyle,
    pub points: Vec<Point>,
    pub svg_path: String,
}

/// A connector from a prerequisite to its dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedEdge {
    pub from_id: SkillId,
    pub to_id: SkillId,
    pub path: PathGeometry,
    /// Whether the dependent is unlocked for the current user.
    pub is_active: bool,
    /// Derived state of the dependent, for styling.
    pub state: UnlockState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(b.right_center(), Point { x: 110.0, y: 40.0 });
        assert_eq!(b.left_center(), Point { x: 10.0, y: 40.0 });
        assert_eq!(b.center(), Point { x: 60.0, y: 40.0 });
    }

    #[test]
    fn test_bounding_box_validity() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, -1.0, 5.0).is_valid());
        assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 5.0).is_valid());
        assert!(!BoundingBox::new(0.0, f64::INFINITY, 1.0, 5.0).is_valid());
    }
}
