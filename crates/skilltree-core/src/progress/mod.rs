//! Per-user unlock/completion state.
//!
//! `ProgressTracker` owns the authoritative state and enforces gating;
//! `ProgressSync` serializes outbound intents through a gateway and keeps
//! an optimistic overlay for display while an intent is in flight.

pub mod sync;
pub mod tracker;

use std::collections::HashMap;

use skilltree_types::progress::UnlockState;
use skilltree_types::skill::SkillId;

pub use sync::ProgressSync;
pub use tracker::{HydrationReport, ProgressSummary, ProgressTracker, StateRepair, TierTotals};

/// Derived unlock state per node for one user, as consumed by routing.
///
/// Nodes without an entry read as `Locked`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressView {
    states: HashMap<SkillId, UnlockState>,
}

impl ProgressView {
    pub fn new(states: HashMap<SkillId, UnlockState>) -> Self {
        Self { states }
    }

    pub fn state_of(&self, id: &SkillId) -> UnlockState {
        self.states.get(id).copied().unwrap_or(UnlockState::Locked)
    }

    pub fn is_unlocked(&self, id: &SkillId) -> bool {
        self.state_of(id).is_unlocked()
    }

    /// Replace the state of one node, e.g. with an optimistic guess.
    pub fn set(&mut self, id: SkillId, state: UnlockState) {
        self.states.insert(id, state);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SkillId, &UnlockState)> {
        self.states.iter()
    }
}
