//! The merged skill graph.
//!
//! `SkillGraph` is the read-only product of [`merge::GraphMerger`]: a node
//! collection with globally unique ids, resolved prerequisite references,
//! and an acyclic prerequisite relation. Downstream components (ranks,
//! progress, layout, routing) share it behind an `Arc`.

pub mod merge;

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use skilltree_types::skill::{normalize_name, PrimarySkill, SkillId, SkillNode};

pub use merge::{GraphMerger, MergeOutcome};

/// Structural problems in a node collection handed to [`SkillGraph::try_from_nodes`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate skill id '{0}'")]
    DuplicateId(SkillId),

    #[error("skill '{skill}' requires unknown skill '{prerequisite}'")]
    UnknownPrerequisite {
        skill: SkillId,
        prerequisite: SkillId,
    },

    #[error("cycle detected involving skill '{0}'")]
    CycleDetected(SkillId),
}

/// Identity-resolved, acyclic skill graph.
#[derive(Debug, Clone, Default)]
pub struct SkillGraph {
    nodes: Vec<SkillNode>,
    index: HashMap<SkillId, usize>,
    dependents: Vec<Vec<SkillId>>,
}

impl SkillGraph {
    /// Index nodes whose invariants the caller already guarantees.
    pub(crate) fn assemble(nodes: Vec<SkillNode>) -> Self {
        let index: HashMap<SkillId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        let mut dependents = vec![Vec::new(); nodes.len()];
        for node in &nodes {
            for prereq in &node.prerequisites {
                if let Some(&p) = index.get(prereq) {
                    dependents[p].push(node.id.clone());
                }
            }
        }

        Self {
            nodes,
            index,
            dependents,
        }
    }

    /// Build a graph from an already-merged node collection (e.g. one loaded
    /// from disk), validating unique ids, known prerequisites and acyclicity.
    pub fn try_from_nodes(nodes: Vec<SkillNode>) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(&node.id) {
                return Err(GraphError::DuplicateId(node.id.clone()));
            }
        }
        for node in &nodes {
            for prereq in &node.prerequisites {
                if !seen.contains(prereq) {
                    return Err(GraphError::UnknownPrerequisite {
                        skill: node.id.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }

        let graph = Self::assemble(nodes);
        graph.topological_order()?;
        Ok(graph)
    }

    pub fn nodes(&self) -> &[SkillNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &SkillId) -> Option<&SkillNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Look a node up by id, then alias id, then normalized name.
    pub fn find(&self, reference: &str) -> Option<&SkillNode> {
        let id = SkillId::from(reference.trim());
        self.get(&id)
            .or_else(|| self.nodes.iter().find(|n| n.aliases.contains(&id)))
            .or_else(|| {
                let key = normalize_name(reference);
                self.nodes.iter().find(|n| n.normalized_name() == key)
            })
    }

    pub fn contains(&self, id: &SkillId) -> bool {
        self.index.contains_key(id)
    }

    /// Direct prerequisites of a node (empty for unknown ids).
    pub fn prerequisites(&self, id: &SkillId) -> &[SkillId] {
        self.get(id)
            .map(|n| n.prerequisites.as_slice())
            .unwrap_or_default()
    }

    /// Direct dependents of a node (empty for unknown ids).
    pub fn dependents(&self, id: &SkillId) -> &[SkillId] {
        self.index
            .get(id)
            .map(|&i| self.dependents[i].as_slice())
            .unwrap_or_default()
    }

    /// All `(prerequisite, dependent)` pairs, in node order then
    /// prerequisite order.
    pub fn edges(&self) -> impl Iterator<Item = (&SkillId, &SkillId)> {
        self.nodes
            .iter()
            .flat_map(|n| n.prerequisites.iter().map(move |p| (p, &n.id)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.prerequisites.len()).sum()
    }

    /// Build a petgraph view with edges from prerequisite to dependent.
    fn to_digraph(&self) -> (DiGraph<&SkillId, ()>, Vec<NodeIndex>) {
        let mut graph = DiGraph::<&SkillId, ()>::new();
        let indices: Vec<_> = self.nodes.iter().map(|n| graph.add_node(&n.id)).collect();
        for (i, node) in self.nodes.iter().enumerate() {
            for prereq in &node.prerequisites {
                if let Some(&p) = self.index.get(prereq) {
                    graph.add_edge(indices[p], indices[i], ());
                }
            }
        }
        (graph, indices)
    }

    /// Ids in an order where every prerequisite precedes its dependents.
    pub fn topological_order(&self) -> Result<Vec<&SkillId>, GraphError> {
        let (graph, _) = self.to_digraph();
        let sorted = toposort(&graph, None)
            .map_err(|cycle| GraphError::CycleDetected(graph[cycle.node_id()].clone()))?;
        Ok(sorted.into_iter().map(|idx| graph[idx]).collect())
    }

    /// Longest prerequisite chain below each node: roots have depth 0.
    pub fn depths(&self) -> HashMap<SkillId, usize> {
        let mut depths: HashMap<SkillId, usize> = HashMap::with_capacity(self.nodes.len());
        // A merged graph is acyclic, so the sort cannot fail; fall back to
        // node order for hand-built graphs rather than panic.
        let order: Vec<&SkillId> = self
            .topological_order()
            .unwrap_or_else(|_| self.nodes.iter().map(|n| &n.id).collect());

        for id in order {
            let depth = self
                .prerequisites(id)
                .iter()
                .map(|p| depths.get(p).copied().unwrap_or(0) + 1)
                .max()
                .unwrap_or(0);
            depths.insert(id.clone(), depth);
        }
        depths
    }

    /// Whether `to` can be reached from `from` by following dependent edges.
    pub fn reaches(&self, from: &SkillId, to: &SkillId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<&SkillId> = self.dependents(from).iter().collect();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.dependents(current));
            }
        }
        false
    }

    /// Whether any node can reach itself.
    pub fn is_acyclic(&self) -> bool {
        let (graph, _) = self.to_digraph();
        !petgraph::algo::is_cyclic_directed(&graph)
    }

    /// Re-express the graph as primary-feed records, for re-merging.
    pub fn to_primary_records(&self) -> Vec<PrimarySkill> {
        self.nodes.iter().cloned().map(PrimarySkill::from).collect()
    }

    pub fn into_nodes(self) -> Vec<SkillNode> {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltree_types::skill::{Attributes, Branch, DifficultyTier, NodeOrigin};

    fn node(id: &str, prereqs: &[&str]) -> SkillNode {
        SkillNode {
            id: SkillId::from(id),
            name: id.to_string(),
            branch: Branch::Push,
            difficulty_tier: DifficultyTier::Beginner,
            rank_override: None,
            prerequisites: prereqs.iter().map(|p| SkillId::from(*p)).collect(),
            supplemental_attributes: Attributes::new(),
            authoring_order: None,
            origin: NodeOrigin::Primary,
            aliases: Vec::new(),
        }
    }

    #[test]
    fn test_try_from_nodes_valid_chain() {
        let graph =
            SkillGraph::try_from_nodes(vec![node("a", &[]), node("b", &["a"]), node("c", &["b"])])
                .unwrap();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependents(&SkillId::from("a")), &[SkillId::from("b")]);
        assert!(graph.reaches(&SkillId::from("a"), &SkillId::from("c")));
        assert!(!graph.reaches(&SkillId::from("c"), &SkillId::from("a")));
    }

    #[test]
    fn test_try_from_nodes_rejects_cycle() {
        let err = SkillGraph::try_from_nodes(vec![node("a", &["b"]), node("b", &["a"])])
            .unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn test_try_from_nodes_rejects_unknown_prerequisite() {
        let err = SkillGraph::try_from_nodes(vec![node("a", &["missing"])]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownPrerequisite { .. }));
    }

    #[test]
    fn test_try_from_nodes_rejects_duplicate_id() {
        let err = SkillGraph::try_from_nodes(vec![node("a", &[]), node("a", &[])]).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateId(_)));
    }

    #[test]
    fn test_depths_diamond() {
        // a -> {b, c} -> d, plus a long arm a -> b -> e -> d
        let graph = SkillGraph::try_from_nodes(vec![
            node("a", &[]),
            node("b", &["a"]),
            node("c", &["a"]),
            node("e", &["b"]),
            node("d", &["c", "e"]),
        ])
        .unwrap();
        let depths = graph.depths();
        assert_eq!(depths[&SkillId::from("a")], 0);
        assert_eq!(depths[&SkillId::from("b")], 1);
        assert_eq!(depths[&SkillId::from("c")], 1);
        assert_eq!(depths[&SkillId::from("e")], 2);
        assert_eq!(depths[&SkillId::from("d")], 3);
    }

    #[test]
    fn test_topological_order_puts_prerequisites_first() {
        let graph =
            SkillGraph::try_from_nodes(vec![node("c", &["b"]), node("b", &["a"]), node("a", &[])])
                .unwrap();
        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|s| s.as_str() == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn test_edges_and_lookup_of_unknown() {
        let graph = SkillGraph::try_from_nodes(vec![node("a", &[]), node("b", &["a"])]).unwrap();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![(&SkillId::from("a"), &SkillId::from("b"))]);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.prerequisites(&SkillId::from("zzz")).is_empty());
        assert!(graph.dependents(&SkillId::from("zzz")).is_empty());
    }

    #[test]
    fn test_find_by_id_or_name() {
        let mut named = node("pull-01", &[]);
        named.name = "Dominadas".to_string();
        named.aliases = vec![SkillId::from("pullups")];
        let graph = SkillGraph::try_from_nodes(vec![named]).unwrap();
        assert_eq!(graph.find("pull-01").unwrap().name, "Dominadas");
        assert_eq!(graph.find("pullups").unwrap().id, SkillId::from("pull-01"));
        assert_eq!(graph.find("  DOMINADAS ").unwrap().id, SkillId::from("pull-01"));
        assert!(graph.find("muscle-up").is_none());
    }
}
