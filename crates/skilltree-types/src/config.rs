//! Global configuration types for the skill tree engine.
//!
//! `SkillTreeConfig` represents the top-level `config.toml` that tunes rank
//! derivation, lane ordering, connector style and recompute debouncing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::layout::ConnectorStyle;
use crate::skill::Branch;

/// Top-level configuration.
///
/// Loaded from `~/.skilltree/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTreeConfig {
    /// Quiet period before a burst of recompute signals is released.
    #[serde(default = "default_recompute_debounce_ms")]
    pub recompute_debounce_ms: u64,

    /// How many of the lowest fine-grained ranks fold into the "beginner"
    /// display tier.
    #[serde(default = "default_beginner_collapse")]
    pub beginner_collapse: usize,

    #[serde(default)]
    pub connector_style: ConnectorStyle,

    /// Lane order. Branches not listed follow in declaration order.
    #[serde(default)]
    pub lane_order: Vec<Branch>,

    /// Rank labels keyed by skill name (normalized on load).
    #[serde(default)]
    pub rank_overrides: BTreeMap<String, String>,
}

fn default_recompute_debounce_ms() -> u64 {
    120
}

fn default_beginner_collapse() -> usize {
    3
}

impl Default for SkillTreeConfig {
    fn default() -> Self {
        Self {
            recompute_debounce_ms: default_recompute_debounce_ms(),
            beginner_collapse: default_beginner_collapse(),
            connector_style: ConnectorStyle::default(),
            lane_order: Vec::new(),
            rank_overrides: BTreeMap::new(),
        }
    }
}
