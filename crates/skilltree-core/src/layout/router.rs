//! Connector routing between measured node boxes.
//!
//! A connector leaves the prerequisite's right edge and enters the
//! dependent's left edge, both at mid-height. Edges whose endpoints have
//! not been measured yet are deferred rather than guessed.

use std::fmt::Write as _;

use serde::Serialize;

use skilltree_types::config::SkillTreeConfig;
use skilltree_types::layout::{ConnectorStyle, PathGeometry, Point, RoutedEdge};
use skilltree_types::skill::SkillId;

use super::engine::TreeLayout;
use crate::graph::SkillGraph;
use crate::progress::ProgressView;

/// An edge that could not be routed because an endpoint has no box yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredEdge {
    pub from_id: SkillId,
    pub to_id: SkillId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteReport {
    pub edges: Vec<RoutedEdge>,
    pub deferred: Vec<DeferredEdge>,
}

/// Computes connector geometry for every prerequisite edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectorRouter {
    style: ConnectorStyle,
}

impl ConnectorRouter {
    pub fn new(style: ConnectorStyle) -> Self {
        Self { style }
    }

    pub fn from_config(config: &SkillTreeConfig) -> Self {
        Self::new(config.connector_style)
    }

    pub fn style(&self) -> ConnectorStyle {
        self.style
    }

    /// Route every edge of `graph`. Activity and styling come from
    /// `activity` on every call; nothing is cached between passes.
    pub fn route(&self, layout: &TreeLayout, graph: &SkillGraph, activity: &ProgressView) -> RouteReport {
        let mut report = RouteReport::default();

        for (from, to) in graph.edges() {
            let (Some(source), Some(target)) = (layout.bounds(from), layout.bounds(to)) else {
                report.deferred.push(DeferredEdge {
                    from_id: from.clone(),
                    to_id: to.clone(),
                });
                continue;
            };

            report.edges.push(RoutedEdge {
                from_id: from.clone(),
                to_id: to.clone(),
                path: self.path(source.right_center(), target.left_center()),
                is_active: activity.is_unlocked(to),
                state: activity.state_of(to),
            });
        }

        if !report.deferred.is_empty() {
            tracing::debug!(
                routed = report.edges.len(),
                deferred = report.deferred.len(),
                "Connectors deferred until geometry is reported"
            );
        }
        report
    }

    /// Path geometry from `start` to `end` in this router's style.
    pub fn path(&self, start: Point, end: Point) -> PathGeometry {
        let points = match self.style {
            ConnectorStyle::Straight => vec![start, end],
            ConnectorStyle::Orthogonal => {
                let mid_x = (start.x + end.x) / 2.0;
                vec![
                    start,
                    Point { x: mid_x, y: start.y },
                    Point { x: mid_x, y: end.y },
                    end,
                ]
            }
            ConnectorStyle::Curved => {
                // Horizontal tangents at both anchors.
                let dx = (end.x - start.x).abs() / 2.0;
                vec![
                    start,
                    Point {
                        x: start.x + dx,
                        y: start.y,
                    },
                    Point {
                        x: end.x - dx,
                        y: end.y,
                    },
                    end,
                ]
            }
        };

        PathGeometry {
            style: self.style,
            svg_path: svg_path(self.style, &points),
            points,
        }
    }
}

fn svg_path(style: ConnectorStyle, points: &[Point]) -> String {
    let mut d = String::new();
    let Some((first, rest)) = points.split_first() else {
        return d;
    };
    let _ = write!(d, "M {} {}", first.x, first.y);

    match style {
        ConnectorStyle::Curved if rest.len() == 3 => {
            let _ = write!(
                d,
                " C {} {}, {} {}, {} {}",
                rest[0].x, rest[0].y, rest[1].x, rest[1].y, rest[2].x, rest[2].y
            );
        }
        _ => {
            for p in rest {
                let _ = write!(d, " L {} {}", p.x, p.y);
            }
        }
    }
    d
}
