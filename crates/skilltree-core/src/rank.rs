//! Rank derivation.
//!
//! Maps a node's difficulty tier, or an explicit override label, onto the
//! canonical 11-value rank scale, and projects ranks onto display tiers for
//! aggregate statistics.

use std::collections::HashMap;

use skilltree_types::config::SkillTreeConfig;
use skilltree_types::rank::{DisplayTier, Rank, RankLabel, RankSource};
use skilltree_types::skill::{normalize_name, DifficultyTier, SkillId, SkillNode};

use crate::graph::SkillGraph;

/// Resolves rank labels for skill nodes.
///
/// Overrides come from two places: the node's own `rank_override` and the
/// configured table keyed by normalized skill name. The node field wins.
#[derive(Debug, Clone)]
pub struct RankResolver {
    overrides: HashMap<String, String>,
    beginner_collapse: usize,
}

impl Default for RankResolver {
    fn default() -> Self {
        Self::from_config(&SkillTreeConfig::default())
    }
}

impl RankResolver {
    /// Build a resolver from a name-keyed override table. Keys are normalized
    /// here so lookups match regardless of case and spacing.
    pub fn new(
        overrides: impl IntoIterator<Item = (String, String)>,
        beginner_collapse: usize,
    ) -> Self {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(name, label)| (normalize_name(&name), label))
                .collect(),
            beginner_collapse,
        }
    }

    pub fn from_config(config: &SkillTreeConfig) -> Self {
        Self::new(
            config
                .rank_overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
            config.beginner_collapse,
        )
    }

    /// Tier-derived rank. Monotone in tier order.
    pub fn tier_rank(tier: DifficultyTier) -> Rank {
        match tier {
            DifficultyTier::Beginner => Rank::D,
            DifficultyTier::Intermediate => Rank::C,
            DifficultyTier::Advanced => Rank::B,
            DifficultyTier::Expert => Rank::A,
        }
    }

    /// Resolve the rank label for a node.
    ///
    /// An override that does not parse onto the rank scale is ignored (with
    /// a warning) and the tier-derived rank is returned instead.
    pub fn resolve_rank(&self, node: &SkillNode) -> RankLabel {
        let candidates = node
            .rank_override
            .as_deref()
            .into_iter()
            .chain(self.overrides.get(&node.normalized_name()).map(String::as_str));

        for label in candidates {
            let text = label.trim();
            match text.parse::<Rank>() {
                Ok(rank) => {
                    return RankLabel {
                        rank,
                        text: text.to_string(),
                        source: RankSource::Override,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        skill = %node.id,
                        label = %label,
                        error = %e,
                        "Ignoring malformed rank override"
                    );
                }
            }
        }

        let rank = Self::tier_rank(node.difficulty_tier);
        RankLabel {
            rank,
            text: rank.to_string(),
            source: RankSource::Tier,
        }
    }

    /// Collapse the lowest `beginner_collapse` fine ranks into the beginner
    /// display tier; everything else keeps its coarse rank.
    pub fn normalize_rank(&self, rank: Rank) -> DisplayTier {
        if rank.ordinal() < self.beginner_collapse {
            DisplayTier::Beginner
        } else {
            DisplayTier::Ranked(rank.coarse())
        }
    }

    /// Resolve every node of the graph.
    pub fn resolve_all(&self, graph: &SkillGraph) -> RankTable {
        RankTable(
            graph
                .nodes()
                .iter()
                .map(|node| (node.id.clone(), self.resolve_rank(node)))
                .collect(),
        )
    }
}

/// Resolved rank per node id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankTable(HashMap<SkillId, RankLabel>);

impl RankTable {
    pub fn get(&self, id: &SkillId) -> Option<&RankLabel> {
        self.0.get(id)
    }

    pub fn rank_of(&self, id: &SkillId) -> Option<Rank> {
        self.0.get(id).map(|label| label.rank)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SkillId, &RankLabel)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltree_types::rank::CoarseRank;
    use skilltree_types::skill::{Attributes, Branch, NodeOrigin};

    fn node(name: &str, tier: DifficultyTier, rank_override: Option<&str>) -> SkillNode {
        SkillNode {
            id: SkillId::from(name),
            name: name.to_string(),
            branch: Branch::Pull,
            difficulty_tier: tier,
            rank_override: rank_override.map(String::from),
            prerequisites: vec![],
            supplemental_attributes: Attributes::new(),
            authoring_order: None,
            origin: NodeOrigin::Primary,
            aliases: Vec::new(),
        }
    }

    #[test]
    fn test_tier_derived_rank() {
        let resolver = RankResolver::default();
        let label = resolver.resolve_rank(&node("Dominadas", DifficultyTier::Beginner, None));
        assert_eq!(label.rank, Rank::D);
        assert_eq!(label.text, "D");
        assert_eq!(label.source, RankSource::Tier);
    }

    #[test]
    fn test_rank_monotone_in_tier() {
        let tiers = [
            DifficultyTier::Beginner,
            DifficultyTier::Intermediate,
            DifficultyTier::Advanced,
            DifficultyTier::Expert,
        ];
        let resolver = RankResolver::default();
        for a in tiers {
            for b in tiers {
                if a < b {
                    let ra = resolver.resolve_rank(&node("x", a, None)).rank;
                    let rb = resolver.resolve_rank(&node("y", b, None)).rank;
                    assert!(ra <= rb, "{a} -> {ra} should not exceed {b} -> {rb}");
                }
            }
        }
    }

    #[test]
    fn test_node_override_returned_verbatim() {
        let resolver = RankResolver::default();
        let label = resolver.resolve_rank(&node("Muscle-up", DifficultyTier::Advanced, Some(" b+ ")));
        assert_eq!(label.rank, Rank::BPlus);
        assert_eq!(label.text, "b+");
        assert_eq!(label.source, RankSource::Override);
    }

    #[test]
    fn test_table_override_keyed_by_normalized_name() {
        let resolver = RankResolver::new(
            [("  FRONT lever ".to_string(), "A".to_string())],
            3,
        );
        let label = resolver.resolve_rank(&node("Front Lever", DifficultyTier::Advanced, None));
        assert_eq!(label.rank, Rank::A);
        assert_eq!(label.source, RankSource::Override);
    }

    #[test]
    fn test_node_override_wins_over_table() {
        let resolver = RankResolver::new([("planche".to_string(), "A".to_string())], 3);
        let label = resolver.resolve_rank(&node("Planche", DifficultyTier::Expert, Some("S")));
        assert_eq!(label.rank, Rank::S);
    }

    #[test]
    fn test_malformed_override_fails_closed_to_tier() {
        let resolver = RankResolver::new([("planche".to_string(), "Z++".to_string())], 3);
        let label = resolver.resolve_rank(&node("Planche", DifficultyTier::Expert, Some("legend")));
        assert_eq!(label.rank, Rank::A);
        assert_eq!(label.source, RankSource::Tier);
    }

    #[test]
    fn test_malformed_node_override_falls_through_to_table() {
        let resolver = RankResolver::new([("planche".to_string(), "S".to_string())], 3);
        let label = resolver.resolve_rank(&node("Planche", DifficultyTier::Expert, Some("???")));
        assert_eq!(label.rank, Rank::S);
        assert_eq!(label.source, RankSource::Override);
    }

    #[test]
    fn test_normalize_rank_collapses_bottom_ranks() {
        let resolver = RankResolver::default();
        assert_eq!(resolver.normalize_rank(Rank::F), DisplayTier::Beginner);
        assert_eq!(resolver.normalize_rank(Rank::E), DisplayTier::Beginner);
        assert_eq!(resolver.normalize_rank(Rank::D), DisplayTier::Beginner);
        assert_eq!(
            resolver.normalize_rank(Rank::CMinus),
            DisplayTier::Ranked(CoarseRank::C)
        );
        assert_eq!(resolver.normalize_rank(Rank::S), DisplayTier::Ranked(CoarseRank::S));
    }

    #[test]
    fn test_normalize_rank_zero_collapse() {
        let resolver = RankResolver::new(std::iter::empty(), 0);
        assert_eq!(resolver.normalize_rank(Rank::F), DisplayTier::Ranked(CoarseRank::F));
    }
}
