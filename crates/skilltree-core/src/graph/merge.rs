//! Identity resolution and merge of the two skill feeds.
//!
//! The primary feed is indexed first by normalized name and id. Secondary
//! records are then folded in: a name match unions prerequisite edges and
//! additive attributes into the existing node; anything else becomes a new
//! node. Prerequisite references are resolved only once every record is
//! indexed, so a reference never creates a duplicate of a node that appears
//! later in either feed. Dangling references get placeholder nodes, and a
//! depth-first pass drops back edges so the result is acyclic.

use std::collections::HashMap;

use petgraph::graph::DiGraph;
use petgraph::visit::{depth_first_search, DfsEvent};

use skilltree_types::error::MergeWarning;
use skilltree_types::skill::{
    normalize_name, slugify, Attributes, Branch, DifficultyTier, NodeOrigin, PrimarySkill,
    SecondarySkill, SkillId, SkillNode, SourceSkill,
};

use super::SkillGraph;

/// Result of a merge: the graph plus every repair applied on the way.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub graph: SkillGraph,
    pub warnings: Vec<MergeWarning>,
}

/// Merges a primary and a secondary skill feed into one [`SkillGraph`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphMerger;

impl GraphMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge the two feeds. Never fails: data problems become warnings.
    pub fn merge(&self, primary: &[PrimarySkill], secondary: &[SecondarySkill]) -> MergeOutcome {
        let mut state = MergeState::default();

        for record in primary {
            state.add_primary(record);
        }
        for record in secondary {
            state.add_secondary(record);
        }

        state.resolve_references();
        state.break_cycles();

        for warning in &state.warnings {
            tracing::warn!(warning = %warning, "Skill graph repaired during merge");
        }
        tracing::debug!(
            nodes = state.nodes.len(),
            warnings = state.warnings.len(),
            "Skill feeds merged"
        );

        MergeOutcome {
            graph: SkillGraph::assemble(state.nodes.into_iter().map(|p| p.node).collect()),
            warnings: state.warnings,
        }
    }

    /// Merge a single stream of tagged records, splitting it by source.
    pub fn merge_sources(&self, records: impl IntoIterator<Item = SourceSkill>) -> MergeOutcome {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        for record in records {
            match record {
                SourceSkill::Primary(p) => primary.push(p),
                SourceSkill::Secondary(s) => secondary.push(s),
            }
        }
        self.merge(&primary, &secondary)
    }
}

// ---------------------------------------------------------------------------
// Merge state
// ---------------------------------------------------------------------------

/// A node under construction with its not-yet-resolved references.
#[derive(Debug)]
struct PendingNode {
    node: SkillNode,
    references: Vec<String>,
}

#[derive(Debug, Default)]
struct MergeState {
    nodes: Vec<PendingNode>,
    /// Normalized name -> node index.
    by_name: HashMap<String, usize>,
    /// Canonical ids and alias ids -> node index.
    by_id: HashMap<SkillId, usize>,
    warnings: Vec<MergeWarning>,
}

impl MergeState {
    fn insert(&mut self, node: SkillNode, references: Vec<String>) -> usize {
        let idx = self.nodes.len();
        self.by_name.insert(node.normalized_name(), idx);
        self.by_id.insert(node.id.clone(), idx);
        self.nodes.push(PendingNode { node, references });
        idx
    }

    /// Union references and attributes of a duplicate record into `idx`.
    fn fold_into(&mut self, idx: usize, references: &[String], attributes: &Attributes) {
        let target = &mut self.nodes[idx];
        for reference in references {
            if !target.references.contains(reference) {
                target.references.push(reference.clone());
            }
        }
        merge_attributes(&mut target.node.supplemental_attributes, attributes);
    }

    /// Point `id` at `idx` unless it already names a node. New aliases are
    /// recorded on the node so they survive a round trip through
    /// [`SkillGraph::to_primary_records`].
    fn register_alias(&mut self, idx: usize, id: &SkillId) {
        if self.by_id.contains_key(id) {
            return;
        }
        self.by_id.insert(id.clone(), idx);
        self.nodes[idx].node.aliases.push(id.clone());
    }

    fn add_primary(&mut self, record: &PrimarySkill) {
        let key = normalize_name(&record.name);

        if let Some(&idx) = self.by_name.get(&key) {
            self.fold_into(idx, &record.prerequisites, &record.supplemental_attributes);
            self.register_alias(idx, &record.id);
            for alias in &record.aliases {
                self.register_alias(idx, alias);
            }
            return;
        }

        if let Some(&idx) = self.by_id.get(&record.id) {
            self.warnings.push(MergeWarning::DuplicateId {
                id: record.id.clone(),
                kept_name: self.nodes[idx].node.name.clone(),
                discarded_name: record.name.clone(),
            });
            self.fold_into(idx, &record.prerequisites, &record.supplemental_attributes);
            for alias in &record.aliases {
                self.register_alias(idx, alias);
            }
            return;
        }

        let idx = self.insert(
            SkillNode {
                id: record.id.clone(),
                name: record.name.trim().to_string(),
                branch: record.branch,
                difficulty_tier: record.difficulty_tier,
                rank_override: record.rank_override.clone(),
                prerequisites: Vec::new(),
                supplemental_attributes: record.supplemental_attributes.clone(),
                authoring_order: record.authoring_order,
                origin: record.origin,
                aliases: Vec::new(),
            },
            record.prerequisites.clone(),
        );
        for alias in &record.aliases {
            self.register_alias(idx, alias);
        }
    }

    fn add_secondary(&mut self, record: &SecondarySkill) {
        let key = normalize_name(&record.name);
        let id = record.effective_id();

        if let Some(&idx) = self.by_name.get(&key) {
            self.reconcile_scalars(idx, record);
            self.fold_into(idx, &record.prerequisites, &record.supplemental_attributes);
            self.register_alias(idx, &id);
            return;
        }

        if let Some(&idx) = self.by_id.get(&id) {
            self.warnings.push(MergeWarning::DuplicateId {
                id,
                kept_name: self.nodes[idx].node.name.clone(),
                discarded_name: record.name.clone(),
            });
            self.fold_into(idx, &record.prerequisites, &record.supplemental_attributes);
            return;
        }

        let branch = self.parse_or_default(
            &record.name,
            "branch",
            record.branch.as_deref(),
            Branch::Core,
        );
        let tier = self.parse_or_default(
            &record.name,
            "difficulty tier",
            record.difficulty_tier.as_deref(),
            DifficultyTier::Beginner,
        );

        self.insert(
            SkillNode {
                id,
                name: record.name.trim().to_string(),
                branch,
                difficulty_tier: tier,
                rank_override: record.rank_override.clone(),
                prerequisites: Vec::new(),
                supplemental_attributes: record.supplemental_attributes.clone(),
                authoring_order: None,
                origin: NodeOrigin::Secondary,
                aliases: Vec::new(),
            },
            record.prerequisites.clone(),
        );
    }

    /// Compare a matched secondary record's scalars against the existing node.
    ///
    /// The existing node's branch and tier are authoritative, except for a
    /// placeholder, which adopts the secondary definition.
    fn reconcile_scalars(&mut self, idx: usize, record: &SecondarySkill) {
        let existing = &self.nodes[idx].node;
        let branch = record
            .branch
            .as_deref()
            .map(|b| (b, b.parse::<Branch>()));
        let tier = record
            .difficulty_tier
            .as_deref()
            .map(|t| (t, t.parse::<DifficultyTier>()));

        if existing.origin == NodeOrigin::Placeholder {
            let node = &mut self.nodes[idx].node;
            if let Some((_, Ok(b))) = branch {
                node.branch = b;
            }
            if let Some((_, Ok(t))) = tier {
                node.difficulty_tier = t;
            }
            node.origin = NodeOrigin::Secondary;
        } else {
            let mut conflicts = Vec::new();
            match branch {
                Some((_, Ok(b))) if b != existing.branch => conflicts.push(MergeWarning::ScalarConflict {
                    id: existing.id.clone(),
                    field: "branch",
                    kept: existing.branch.to_string(),
                    secondary: b.to_string(),
                }),
                Some((raw, Err(_))) => conflicts.push(MergeWarning::UnrecognizedValue {
                    name: record.name.clone(),
                    field: "branch",
                    value: raw.to_string(),
                    fallback: existing.branch.to_string(),
                }),
                _ => {}
            }
            match tier {
                Some((_, Ok(t))) if t != existing.difficulty_tier => {
                    conflicts.push(MergeWarning::ScalarConflict {
                        id: existing.id.clone(),
                        field: "difficulty tier",
                        kept: existing.difficulty_tier.to_string(),
                        secondary: t.to_string(),
                    })
                }
                Some((raw, Err(_))) => conflicts.push(MergeWarning::UnrecognizedValue {
                    name: record.name.clone(),
                    field: "difficulty tier",
                    value: raw.to_string(),
                    fallback: existing.difficulty_tier.to_string(),
                }),
                _ => {}
            }
            self.warnings.extend(conflicts);
        }

        let node = &mut self.nodes[idx].node;
        if node.rank_override.is_none() {
            node.rank_override = record.rank_override.clone();
        }
    }

    fn parse_or_default<T>(
        &mut self,
        name: &str,
        field: &'static str,
        raw: Option<&str>,
        fallback: T,
    ) -> T
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
    {
        match raw.map(str::parse::<T>) {
            Some(Ok(value)) => value,
            other => {
                self.warnings.push(MergeWarning::UnrecognizedValue {
                    name: name.to_string(),
                    field,
                    value: match other {
                        Some(_) => raw.unwrap_or_default().to_string(),
                        None => "(missing)".to_string(),
                    },
                    fallback: fallback.to_string(),
                });
                fallback
            }
        }
    }

    /// Look up a reference by id (canonical or alias), then by normalized name.
    fn lookup(&self, reference: &str) -> Option<usize> {
        let trimmed = reference.trim();
        self.by_id
            .get(trimmed)
            .or_else(|| self.by_name.get(&normalize_name(trimmed)))
            .copied()
    }

    /// Rewrite every raw reference to a canonical id, synthesizing
    /// placeholders for references that match nothing.
    fn resolve_references(&mut self) {
        let original_len = self.nodes.len();
        for idx in 0..original_len {
            let references = std::mem::take(&mut self.nodes[idx].references);
            let mut resolved: Vec<SkillId> = Vec::with_capacity(references.len());

            for reference in references {
                if reference.trim().is_empty() {
                    continue;
                }
                let target = match self.lookup(&reference) {
                    Some(target) => target,
                    None => self.synthesize_placeholder(idx, &reference),
                };
                if target == idx {
                    self.warnings.push(MergeWarning::SelfReference {
                        id: self.nodes[idx].node.id.clone(),
                    });
                    continue;
                }
                let target_id = self.nodes[target].node.id.clone();
                if !resolved.contains(&target_id) {
                    resolved.push(target_id);
                }
            }

            self.nodes[idx].node.prerequisites = resolved;
        }
    }

    fn synthesize_placeholder(&mut self, referenced_by: usize, reference: &str) -> usize {
        let name = reference.trim().to_string();
        let slug = slugify(&name);
        let base = if slug.is_empty() {
            "ext:unnamed".to_string()
        } else {
            format!("ext:{slug}")
        };
        let mut id = SkillId(base.clone());
        let mut suffix = 2;
        while self.by_id.contains_key(&id) {
            id = SkillId(format!("{base}-{suffix}"));
            suffix += 1;
        }

        let referencing = &self.nodes[referenced_by].node;
        self.warnings.push(MergeWarning::DanglingPrerequisite {
            referenced_by: referencing.id.clone(),
            reference: name.clone(),
            placeholder: id.clone(),
        });

        let branch = referencing.branch;
        self.insert(
            SkillNode {
                id,
                name,
                branch,
                difficulty_tier: DifficultyTier::Beginner,
                rank_override: None,
                prerequisites: Vec::new(),
                supplemental_attributes: Attributes::new(),
                authoring_order: None,
                origin: NodeOrigin::Placeholder,
                aliases: Vec::new(),
            },
            Vec::new(),
        )
    }

    /// Drop every back edge found by a depth-first traversal in node order.
    ///
    /// Edges point from prerequisite to dependent; a back edge `u -> v`
    /// leaves the later-discovered node `u` toward its ancestor `v`, so `u`
    /// is removed from `v`'s prerequisites.
    fn break_cycles(&mut self) {
        let mut graph = DiGraph::<usize, ()>::new();
        let indices: Vec<_> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();
        for (i, pending) in self.nodes.iter().enumerate() {
            for prereq in &pending.node.prerequisites {
                if let Some(&p) = self.by_id.get(prereq) {
                    graph.add_edge(indices[p], indices[i], ());
                }
            }
        }

        let mut back_edges = Vec::new();
        depth_first_search(&graph, indices.iter().copied(), |event| {
            if let DfsEvent::BackEdge(u, v) = event {
                back_edges.push((graph[u], graph[v]));
            }
        });

        for (prereq_idx, dependent_idx) in back_edges {
            let prereq_id = self.nodes[prereq_idx].node.id.clone();
            let dependent = &mut self.nodes[dependent_idx].node;
            dependent.prerequisites.retain(|p| p != &prereq_id);
            self.warnings.push(MergeWarning::CycleEdgeDropped {
                prerequisite: prereq_id,
                dependent: dependent.id.clone(),
            });
        }
    }
}

/// Merge `incoming` into `target` without overwriting anything present.
/// Nested objects are merged key by key under the same rule.
fn merge_attributes(target: &mut Attributes, incoming: &Attributes) {
    for (key, value) in incoming {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), value.clone());
            }
            Some(serde_json::Value::Object(existing)) => {
                if let serde_json::Value::Object(extra) = value {
                    for (k, v) in extra {
                        existing.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn primary(id: &str, name: &str, branch: Branch, prereqs: &[&str]) -> PrimarySkill {
        PrimarySkill {
            id: SkillId::from(id),
            name: name.to_string(),
            branch,
            difficulty_tier: DifficultyTier::Beginner,
            prerequisites: prereqs.iter().map(|p| p.to_string()).collect(),
            supplemental_attributes: Attributes::new(),
            rank_override: None,
            authoring_order: None,
            origin: NodeOrigin::Primary,
            aliases: Vec::new(),
        }
    }

    fn secondary(name: &str, branch: Option<&str>, prereqs: &[&str]) -> SecondarySkill {
        SecondarySkill {
            id: None,
            name: name.to_string(),
            branch: branch.map(String::from),
            difficulty_tier: Some("advanced".to_string()),
            prerequisites: prereqs.iter().map(|p| p.to_string()).collect(),
            supplemental_attributes: Attributes::new(),
            rank_override: None,
        }
    }

    fn edge_set(graph: &SkillGraph) -> BTreeSet<(String, String)> {
        graph
            .edges()
            .map(|(p, d)| (p.0.clone(), d.0.clone()))
            .collect()
    }

    fn id_set(graph: &SkillGraph) -> BTreeSet<String> {
        graph.nodes().iter().map(|n| n.id.0.clone()).collect()
    }

    #[test]
    fn test_secondary_prerequisite_attaches_to_primary_canonical_id() {
        let a = vec![primary("bal-01", "Handstand", Branch::Balance, &[])];
        let b = vec![secondary("Handstand push-up", Some("push"), &["handstand"])];

        let outcome = GraphMerger::new().merge(&a, &b);
        let graph = &outcome.graph;

        assert_eq!(graph.len(), 2, "no duplicate Handstand node");
        let hspu = graph.get(&SkillId::from("handstand-push-up")).unwrap();
        assert_eq!(hspu.prerequisites, vec![SkillId::from("bal-01")]);
        assert_eq!(hspu.origin, NodeOrigin::Secondary);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    #[test]
    fn test_name_match_unions_prerequisites_and_keeps_identity() {
        let a = vec![
            primary("pull-01", "Dominadas", Branch::Pull, &[]),
            primary("pull-00", "Colgarse", Branch::Pull, &[]),
            primary("pull-02", "Dominadas avanzadas", Branch::Pull, &["pull-01"]),
        ];
        let mut s = secondary("  DOMINADAS  avanzadas", Some("pull"), &["Dominadas", "colgarse"]);
        s.id = Some(SkillId::from("adv-pullups"));
        s.difficulty_tier = Some("beginner".to_string());

        let outcome = GraphMerger::new().merge(&a, &[s]);
        let node = outcome.graph.get(&SkillId::from("pull-02")).unwrap();

        assert_eq!(outcome.graph.len(), 3);
        assert_eq!(
            node.prerequisites,
            vec![SkillId::from("pull-01"), SkillId::from("pull-00")]
        );
        assert_eq!(node.branch, Branch::Pull);
        assert_eq!(node.difficulty_tier, DifficultyTier::Beginner);
        assert_eq!(node.origin, NodeOrigin::Primary);
    }

    #[test]
    fn test_scalar_conflict_is_reported_not_applied() {
        let a = vec![primary("pull-01", "Dominadas", Branch::Pull, &[])];
        let b = vec![secondary("Dominadas", Some("push"), &[])];

        let outcome = GraphMerger::new().merge(&a, &b);
        let node = outcome.graph.get(&SkillId::from("pull-01")).unwrap();

        assert_eq!(node.branch, Branch::Pull);
        assert_eq!(node.difficulty_tier, DifficultyTier::Beginner);
        let fields: Vec<_> = outcome
            .warnings
            .iter()
            .filter_map(|w| match w {
                MergeWarning::ScalarConflict { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec!["branch", "difficulty tier"]);
    }

    #[test]
    fn test_secondary_alias_id_resolves_to_canonical() {
        let a = vec![primary("core-01", "Plank", Branch::Core, &[])];
        let mut alias = secondary("plank", Some("core"), &[]);
        alias.id = Some(SkillId::from("sec-plank"));
        let dependent = secondary("L-sit", Some("core"), &["sec-plank"]);

        let outcome = GraphMerger::new().merge(&a, &[alias, dependent]);
        let lsit = outcome.graph.get(&SkillId::from("l-sit")).unwrap();
        assert_eq!(lsit.prerequisites, vec![SkillId::from("core-01")]);
        assert!(!outcome.graph.contains(&SkillId::from("sec-plank")));
    }

    #[test]
    fn test_forward_reference_within_secondary_does_not_duplicate() {
        let b = vec![
            secondary("Muscle-up", Some("pull"), &["Pull-up explosivo"]),
            secondary("Pull-up explosivo", Some("pull"), &[]),
        ];
        let outcome = GraphMerger::new().merge(&[], &b);
        assert_eq!(outcome.graph.len(), 2);
        assert!(outcome
            .warnings
            .iter()
            .all(|w| !matches!(w, MergeWarning::DanglingPrerequisite { .. })));
    }

    #[test]
    fn test_duplicate_id_keeps_primary_and_merges_edges() {
        let a = vec![
            primary("x-1", "Flexiones", Branch::Push, &[]),
            primary("x-0", "Plancha", Branch::Core, &[]),
        ];
        let mut colliding = secondary("Fondos", Some("push"), &["Plancha"]);
        colliding.id = Some(SkillId::from("x-1"));
        colliding
            .supplemental_attributes
            .insert("muscles".to_string(), json!(["triceps"]));

        let outcome = GraphMerger::new().merge(&a, &[colliding]);
        let node = outcome.graph.get(&SkillId::from("x-1")).unwrap();

        assert_eq!(outcome.graph.len(), 2);
        assert_eq!(node.name, "Flexiones");
        assert_eq!(node.prerequisites, vec![SkillId::from("x-0")]);
        assert_eq!(node.supplemental_attributes["muscles"], json!(["triceps"]));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, MergeWarning::DuplicateId { .. })));
    }

    #[test]
    fn test_attributes_are_additive_only() {
        let mut a = primary("legs-01", "Pistol squat", Branch::Legs, &[]);
        a.supplemental_attributes
            .insert("demand".to_string(), json!({"strength": 3}));
        a.supplemental_attributes.insert("equipment".to_string(), json!("none"));

        let mut b = secondary("Pistol Squat", Some("legs"), &[]);
        b.supplemental_attributes
            .insert("demand".to_string(), json!({"strength": 5, "mobility": 4}));
        b.supplemental_attributes.insert("equipment".to_string(), json!("box"));
        b.supplemental_attributes.insert("video".to_string(), json!("pistol.mp4"));

        let outcome = GraphMerger::new().merge(&[a], &[b]);
        let attrs = &outcome
            .graph
            .get(&SkillId::from("legs-01"))
            .unwrap()
            .supplemental_attributes;

        assert_eq!(attrs["demand"], json!({"strength": 3, "mobility": 4}));
        assert_eq!(attrs["equipment"], json!("none"));
        assert_eq!(attrs["video"], json!("pistol.mp4"));
    }

    #[test]
    fn test_dangling_reference_synthesizes_one_placeholder_in_same_branch() {
        let a = vec![
            primary("push-05", "Planche", Branch::Push, &["Tuck planche"]),
            primary("push-06", "Planche push-up", Branch::Push, &["tuck  planche"]),
        ];
        let outcome = GraphMerger::new().merge(&a, &[]);
        let graph = &outcome.graph;

        assert_eq!(graph.len(), 3);
        let placeholder = graph.get(&SkillId::from("ext:tuck-planche")).unwrap();
        assert_eq!(placeholder.origin, NodeOrigin::Placeholder);
        assert_eq!(placeholder.branch, Branch::Push);
        assert_eq!(
            graph.prerequisites(&SkillId::from("push-06")),
            &[SkillId::from("ext:tuck-planche")]
        );
        let dangling = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, MergeWarning::DanglingPrerequisite { .. }))
            .count();
        assert_eq!(dangling, 1);
    }

    #[test]
    fn test_placeholder_is_upgraded_when_secondary_defines_it() {
        let mut placeholder = primary("ext:tuck-planche", "Tuck planche", Branch::Push, &[]);
        placeholder.origin = NodeOrigin::Placeholder;
        let b = vec![secondary("Tuck Planche", Some("balance"), &[])];

        let outcome = GraphMerger::new().merge(&[placeholder], &b);
        let node = outcome.graph.get(&SkillId::from("ext:tuck-planche")).unwrap();
        assert_eq!(node.origin, NodeOrigin::Secondary);
        assert_eq!(node.branch, Branch::Balance);
        assert_eq!(node.difficulty_tier, DifficultyTier::Advanced);
    }

    #[test]
    fn test_self_reference_dropped() {
        let a = vec![primary("a", "A", Branch::Core, &["a", "A"])];
        let outcome = GraphMerger::new().merge(&a, &[]);
        assert!(outcome.graph.prerequisites(&SkillId::from("a")).is_empty());
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, MergeWarning::SelfReference { .. })));
    }

    #[test]
    fn test_mutual_prerequisites_drop_exactly_one_edge() {
        let a = vec![
            primary("a", "Front lever", Branch::Pull, &["b"]),
            primary("b", "Back lever", Branch::Pull, &["a"]),
        ];
        let outcome = GraphMerger::new().merge(&a, &[]);

        assert_eq!(outcome.graph.edge_count(), 1);
        assert!(outcome.graph.is_acyclic());
        let dropped = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, MergeWarning::CycleEdgeDropped { .. }))
            .count();
        assert_eq!(dropped, 1);
        // Traversal terminates on the repaired graph.
        assert!(outcome.graph.topological_order().is_ok());
    }

    #[test]
    fn test_cycle_across_sources_is_broken() {
        let a = vec![
            primary("a", "A", Branch::Core, &[]),
            primary("b", "B", Branch::Core, &["a"]),
            primary("c", "C", Branch::Core, &["b"]),
        ];
        let b = vec![secondary("A", Some("core"), &["C"])];

        let outcome = GraphMerger::new().merge(&a, &b);
        assert!(outcome.graph.is_acyclic());
        assert_eq!(outcome.graph.edge_count(), 2);
        for node in outcome.graph.nodes() {
            assert!(!outcome.graph.reaches(&node.id, &node.id));
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = vec![
            primary("bal-01", "Handstand", Branch::Balance, &[]),
            primary("pull-01", "Dominadas", Branch::Pull, &[]),
            primary("pull-02", "Dominadas avanzadas", Branch::Pull, &["Dominadas"]),
            primary("x", "Front lever", Branch::Pull, &["y"]),
            primary("y", "Back lever", Branch::Pull, &["x"]),
        ];
        let b = vec![
            secondary("Handstand push-up", Some("push"), &["Handstand", "Pike push-up"]),
            secondary("Dominadas", Some("pull"), &["Colgarse"]),
        ];

        let merger = GraphMerger::new();
        let first = merger.merge(&a, &b);
        let second = merger.merge(&first.graph.to_primary_records(), &b);

        assert_eq!(id_set(&first.graph), id_set(&second.graph));
        assert_eq!(edge_set(&first.graph), edge_set(&second.graph));
        assert_eq!(first.graph.edge_count(), second.graph.edge_count());
        assert!(second.graph.is_acyclic());
        for node in second.graph.nodes() {
            let original = first.graph.get(&node.id).unwrap();
            assert_eq!(node.origin, original.origin);
        }
    }

    #[test]
    fn test_alias_reference_survives_remerge() {
        let a = vec![
            primary("p1", "Plank", Branch::Core, &[]),
            primary("p2", "plank", Branch::Core, &[]),
        ];
        let b = vec![secondary("L-sit", Some("core"), &["p2"])];

        let merger = GraphMerger::new();
        let first = merger.merge(&a, &b);
        assert_eq!(
            first.graph.get(&SkillId::from("p1")).unwrap().aliases,
            vec![SkillId::from("p2")]
        );

        let second = merger.merge(&first.graph.to_primary_records(), &b);
        assert_eq!(id_set(&second.graph), id_set(&first.graph));
        assert_eq!(edge_set(&second.graph), edge_set(&first.graph));
        assert_eq!(
            edge_set(&second.graph),
            BTreeSet::from([("p1".to_string(), "l-sit".to_string())])
        );
        assert!(!second
            .warnings
            .iter()
            .any(|w| matches!(w, MergeWarning::DanglingPrerequisite { .. })));
        assert_eq!(
            second.graph.get(&SkillId::from("p1")).unwrap().aliases,
            vec![SkillId::from("p2")]
        );
    }

    #[test]
    fn test_secondary_unknown_branch_defaults_with_warning() {
        let b = vec![secondary("Dragon flag", Some("cardio"), &[])];
        let outcome = GraphMerger::new().merge(&[], &b);
        let node = outcome.graph.get(&SkillId::from("dragon-flag")).unwrap();
        assert_eq!(node.branch, Branch::Core);
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            MergeWarning::UnrecognizedValue { field: "branch", .. }
        )));
    }

    #[test]
    fn test_merge_sources_splits_tagged_records() {
        let records = vec![
            SourceSkill::Secondary(secondary("Handstand push-up", Some("push"), &["Handstand"])),
            SourceSkill::Primary(primary("bal-01", "Handstand", Branch::Balance, &[])),
        ];
        let outcome = GraphMerger::new().merge_sources(records);
        // Primary is indexed first regardless of stream position.
        assert_eq!(outcome.graph.nodes()[0].id, SkillId::from("bal-01"));
        assert_eq!(outcome.graph.len(), 2);
    }
}
