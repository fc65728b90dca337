//! Signals and events for the skill tree view.
//!
//! `RecomputeSignal` is what producers post to the debounced recompute
//! queue; `TreeEvent` is what the event bus broadcasts to subscribers.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::progress::{UnlockState, UserId};
use crate::skill::SkillId;

/// A reason to recompute layout and routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecomputeSignal {
    /// The merged graph was replaced.
    GraphUpdated,
    /// Rank overrides or the collapse threshold changed.
    RanksChanged,
    /// The viewport was resized.
    ViewportResized,
    /// A materialized node reported new geometry.
    GeometryMutated { node_id: SkillId },
    /// A user's progress changed (affects connector styling only).
    ProgressChanged { skill_id: SkillId },
}

impl RecomputeSignal {
    /// Whether lane ordering must be recomputed, as opposed to only
    /// refreshing geometry and connector styling.
    pub fn affects_ordering(&self) -> bool {
        matches!(
            self,
            RecomputeSignal::GraphUpdated | RecomputeSignal::RanksChanged
        )
    }
}

/// Events broadcast while the tree is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeEvent {
    /// A debounced recompute finished.
    RecomputeCompleted {
        generation: u64,
        signal_count: usize,
        routed_edges: usize,
        deferred_edges: usize,
    },

    /// A recompute result was discarded because a newer one superseded it.
    RecomputeSuperseded { generation: u64, current: u64 },

    /// A node changed state for a user.
    SkillStateChanged {
        user_id: UserId,
        skill_id: SkillId,
        state: UnlockState,
    },

    /// A transition was refused.
    TransitionRejected {
        user_id: UserId,
        skill_id: SkillId,
        reason: String,
    },
}
