//! Lane grouping and in-lane ordering.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use skilltree_types::config::SkillTreeConfig;
use skilltree_types::error::GeometryError;
use skilltree_types::layout::{BoundingBox, Lane, NodeLayout};
use skilltree_types::skill::{Branch, SkillId, SkillNode};

use super::geometry::GeometryRegistry;
use crate::graph::SkillGraph;
use crate::rank::{RankResolver, RankTable};

/// Lanes plus one layout record per node, in lane then slot order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeLayout {
    pub lanes: Vec<Lane>,
    pub nodes: Vec<NodeLayout>,
    /// Node id -> position in `nodes`.
    #[serde(skip)]
    index: HashMap<SkillId, usize>,
}

impl TreeLayout {
    pub fn get(&self, id: &SkillId) -> Option<&NodeLayout> {
        self.index
            .get(id)
            .and_then(|&i| self.nodes.get(i))
            .filter(|n| &n.node_id == id)
    }

    /// Measured box of a node, if the surface has reported one.
    pub fn bounds(&self, id: &SkillId) -> Option<BoundingBox> {
        self.get(id).and_then(|n| n.bounds)
    }

    /// Nodes still waiting for a measurement.
    pub fn unmeasured(&self) -> impl Iterator<Item = &SkillId> {
        self.nodes
            .iter()
            .filter(|n| n.bounds.is_none())
            .map(|n| &n.node_id)
    }
}

/// Groups nodes into lanes and owns the measured-geometry registry.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    lane_order: Vec<Branch>,
    registry: GeometryRegistry,
}

impl LayoutEngine {
    /// `lane_order` may list only some branches; the rest follow in
    /// declaration order.
    pub fn new(lane_order: Vec<Branch>) -> Self {
        Self {
            lane_order,
            registry: GeometryRegistry::new(),
        }
    }

    pub fn from_config(config: &SkillTreeConfig) -> Self {
        Self::new(config.lane_order.clone())
    }

    pub fn registry(&self) -> &GeometryRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GeometryRegistry {
        &mut self.registry
    }

    /// Bind the registry to a (new) graph.
    pub fn bind(&mut self, graph: &SkillGraph) {
        self.registry.bind(graph);
    }

    pub fn report_geometry(&mut self, id: &SkillId, bounds: BoundingBox) -> Result<(), GeometryError> {
        self.registry.report(id, bounds)
    }

    /// Effective branch order: configured branches first (deduplicated),
    /// then the remaining branches in declaration order.
    pub fn branch_order(&self) -> Vec<Branch> {
        let mut order: Vec<Branch> = Vec::with_capacity(Branch::ALL.len());
        for branch in self.lane_order.iter().chain(Branch::ALL.iter()) {
            if !order.contains(branch) {
                order.push(*branch);
            }
        }
        order
    }

    /// Lay out every node of `graph`. Pure: identical inputs give identical
    /// output.
    pub fn layout(&self, graph: &SkillGraph, ranks: &RankTable) -> TreeLayout {
        let depths = graph.depths();
        let mut by_branch: HashMap<Branch, Vec<&SkillNode>> = HashMap::new();
        for node in graph.nodes() {
            by_branch.entry(node.branch).or_default().push(node);
        }

        let mut layout = TreeLayout::default();
        for branch in self.branch_order() {
            let Some(mut members) = by_branch.remove(&branch) else {
                continue;
            };
            members.sort_by(|a, b| compare_in_lane(a, b, ranks));

            let lane_index = layout.lanes.len();
            for (slot, node) in members.iter().enumerate() {
                layout.index.insert(node.id.clone(), layout.nodes.len());
                layout.nodes.push(NodeLayout {
                    node_id: node.id.clone(),
                    lane: branch,
                    lane_index,
                    order_within_lane: slot,
                    depth: depths.get(&node.id).copied().unwrap_or(0),
                    bounds: self.registry.get(&node.id),
                });
            }
            layout.lanes.push(Lane {
                branch,
                nodes: members.iter().map(|n| n.id.clone()).collect(),
            });
        }

        tracing::debug!(
            lanes = layout.lanes.len(),
            nodes = layout.nodes.len(),
            measured = self.registry.len(),
            "Layout computed"
        );
        layout
    }
}

/// Authoring order (present first), then rank, prerequisite count,
/// normalized name and id.
fn compare_in_lane(a: &SkillNode, b: &SkillNode, ranks: &RankTable) -> Ordering {
    let authored = match (a.authoring_order, b.authoring_order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    let rank = |n: &SkillNode| {
        ranks
            .rank_of(&n.id)
            .unwrap_or_else(|| RankResolver::tier_rank(n.difficulty_tier))
    };

    authored
        .then_with(|| rank(a).cmp(&rank(b)))
        .then_with(|| a.prerequisites.len().cmp(&b.prerequisites.len()))
        .then_with(|| a.normalized_name().cmp(&b.normalized_name()))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltree_types::skill::{Attributes, DifficultyTier, NodeOrigin};

    fn node(
        id: &str,
        branch: Branch,
        tier: DifficultyTier,
        order: Option<u32>,
        prereqs: &[&str],
    ) -> SkillNode {
        SkillNode {
            id: SkillId::from(id),
            name: id.to_string(),
            branch,
            difficulty_tier: tier,
            rank_override: None,
            prerequisites: prereqs.iter().map(|p| SkillId::from(*p)).collect(),
            supplemental_attributes: Attributes::new(),
            authoring_order: order,
            origin: NodeOrigin::Primary,
            aliases: Vec::new(),
        }
    }

    fn sample_graph() -> SkillGraph {
        SkillGraph::try_from_nodes(vec![
            node("muscle-up", Branch::Pull, DifficultyTier::Advanced, None, &["dominadas"]),
            node("l-sit", Branch::Core, DifficultyTier::Intermediate, None, &[]),
            node("dominadas", Branch::Pull, DifficultyTier::Beginner, None, &[]),
            node("australianas", Branch::Pull, DifficultyTier::Beginner, Some(0), &[]),
            node("front-lever", Branch::Pull, DifficultyTier::Advanced, None, &[]),
        ])
        .unwrap()
    }

    fn lane_ids(layout: &TreeLayout, branch: Branch) -> Vec<&str> {
        layout
            .lanes
            .iter()
            .find(|l| l.branch == branch)
            .map(|l| l.nodes.iter().map(|id| id.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_lanes_follow_branch_declaration_order() {
        let graph = sample_graph();
        let ranks = RankResolver::default().resolve_all(&graph);
        let layout = LayoutEngine::default().layout(&graph, &ranks);

        let branches: Vec<_> = layout.lanes.iter().map(|l| l.branch).collect();
        assert_eq!(branches, vec![Branch::Pull, Branch::Core]);
        assert_eq!(layout.nodes.len(), 5);
    }

    #[test]
    fn test_configured_lane_order_wins() {
        let graph = sample_graph();
        let ranks = RankResolver::default().resolve_all(&graph);
        let layout = LayoutEngine::new(vec![Branch::Core, Branch::Core]).layout(&graph, &ranks);

        let branches: Vec<_> = layout.lanes.iter().map(|l| l.branch).collect();
        assert_eq!(branches, vec![Branch::Core, Branch::Pull]);
        assert_eq!(layout.get(&SkillId::from("l-sit")).unwrap().lane_index, 0);
    }

    #[test]
    fn test_in_lane_ordering_chain() {
        let graph = sample_graph();
        let ranks = RankResolver::default().resolve_all(&graph);
        let layout = LayoutEngine::default().layout(&graph, &ranks);

        // Authored first, then rank; equal rank B breaks on prerequisite count.
        assert_eq!(
            lane_ids(&layout, Branch::Pull),
            vec!["australianas", "dominadas", "front-lever", "muscle-up"]
        );
        let muscle_up = layout.get(&SkillId::from("muscle-up")).unwrap();
        assert_eq!(muscle_up.order_within_lane, 3);
        assert_eq!(muscle_up.depth, 1);
    }

    #[test]
    fn test_name_then_id_break_remaining_ties() {
        let mut a = node("b-id", Branch::Legs, DifficultyTier::Beginner, None, &[]);
        a.name = "Sentadilla".to_string();
        let mut b = node("a-id", Branch::Legs, DifficultyTier::Beginner, None, &[]);
        b.name = "sentadilla ".to_string();
        let c = node("pistol", Branch::Legs, DifficultyTier::Beginner, None, &[]);
        let graph = SkillGraph::try_from_nodes(vec![c, a, b]).unwrap();
        let ranks = RankResolver::default().resolve_all(&graph);

        let layout = LayoutEngine::default().layout(&graph, &ranks);
        assert_eq!(lane_ids(&layout, Branch::Legs), vec!["pistol", "a-id", "b-id"]);
    }

    #[test]
    fn test_layout_is_deterministic_and_copies_geometry() {
        let graph = sample_graph();
        let ranks = RankResolver::default().resolve_all(&graph);
        let mut engine = LayoutEngine::default();
        engine.bind(&graph);
        let bounds = BoundingBox::new(4.0, 8.0, 120.0, 44.0);
        engine.report_geometry(&SkillId::from("dominadas"), bounds).unwrap();

        let first = engine.layout(&graph, &ranks);
        let second = engine.layout(&graph, &ranks);
        assert_eq!(first, second);
        assert_eq!(first.bounds(&SkillId::from("dominadas")), Some(bounds));
        assert_eq!(first.unmeasured().count(), 4);
    }

    #[test]
    fn test_lookup_by_id_matches_position() {
        let graph = sample_graph();
        let ranks = RankResolver::default().resolve_all(&graph);
        let layout = LayoutEngine::default().layout(&graph, &ranks);

        for (i, placed) in layout.nodes.iter().enumerate() {
            let found = layout.get(&placed.node_id).unwrap();
            assert!(std::ptr::eq(found, &layout.nodes[i]));
        }
        assert!(layout.get(&SkillId::from("planche")).is_none());
        assert!(TreeLayout::default().get(&SkillId::from("l-sit")).is_none());
    }

    #[test]
    fn test_rank_override_reorders_lane() {
        let mut front = node("front-lever", Branch::Pull, DifficultyTier::Advanced, None, &[]);
        front.rank_override = Some("C-".to_string());
        let graph = SkillGraph::try_from_nodes(vec![
            node("dominadas", Branch::Pull, DifficultyTier::Beginner, None, &[]),
            front,
            node("commando", Branch::Pull, DifficultyTier::Intermediate, None, &[]),
        ])
        .unwrap();
        let ranks = RankResolver::default().resolve_all(&graph);
        let layout = LayoutEngine::default().layout(&graph, &ranks);

        assert_eq!(
            lane_ids(&layout, Branch::Pull),
            vec!["dominadas", "front-lever", "commando"]
        );
    }
}
