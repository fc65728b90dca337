//! Authoritative per-user skill state and the unlock state machine.
//!
//! States move `Locked -> Unlockable -> Unlocked -> Completed`, where
//! `Unlockable` is derived on read from prerequisite completion and never
//! stored. Every transition validates before it mutates, so a rejected
//! transition leaves the tracker untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use skilltree_types::error::TransitionError;
use skilltree_types::progress::{CompletionMetrics, UnlockState, UserId, UserSkillState};
use skilltree_types::rank::DisplayTier;
use skilltree_types::skill::SkillId;

use super::ProgressView;
use crate::graph::SkillGraph;
use crate::rank::{RankResolver, RankTable};

/// A correction applied to stored state that broke an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateRepair {
    /// A completed record was not marked unlocked.
    UnlockedForCompletion { skill_id: SkillId },
    /// Unlocked while a prerequisite was not completed; reset to locked.
    Demoted {
        skill_id: SkillId,
        missing: Vec<SkillId>,
    },
    /// Progress out of range or inconsistent with completion.
    ProgressClamped { skill_id: SkillId, from: u8, to: u8 },
}

/// Outcome of ingesting status records (or rebinding to a new graph).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HydrationReport {
    /// Records accepted into the tracker.
    pub applied: usize,
    /// Records whose skill is not part of the graph; ignored.
    pub unknown: Vec<SkillId>,
    pub repairs: Vec<StateRepair>,
}

impl HydrationReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.repairs.is_empty()
    }
}

/// Node counts for one display tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierTotals {
    pub tier: DisplayTier,
    pub total: usize,
    pub unlocked: usize,
    pub completed: usize,
}

/// Aggregate progress for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub user_id: UserId,
    pub total: usize,
    pub unlocked: usize,
    pub completed: usize,
    /// Ascending by display tier.
    pub tiers: Vec<TierTotals>,
}

type UserStates = HashMap<SkillId, UserSkillState>;

/// Owns every user's skill state against one merged graph.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    graph: Arc<SkillGraph>,
    users: HashMap<UserId, UserStates>,
}

impl ProgressTracker {
    pub fn new(graph: Arc<SkillGraph>) -> Self {
        Self {
            graph,
            users: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &Arc<SkillGraph> {
        &self.graph
    }

    /// Users observed so far.
    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.users.keys()
    }

    fn ensure_known(&self, id: &SkillId) -> Result<(), TransitionError> {
        if self.graph.contains(id) {
            Ok(())
        } else {
            Err(TransitionError::UnknownSkill(id.clone()))
        }
    }

    fn stored(&self, user: &UserId, id: &SkillId) -> Option<&UserSkillState> {
        self.users.get(user).and_then(|states| states.get(id))
    }

    fn is_completed(&self, user: &UserId, id: &SkillId) -> bool {
        self.stored(user, id).is_some_and(|s| s.is_completed)
    }

    /// Create locked records for every node the user has no record for.
    pub fn observe(&mut self, user: &UserId) {
        self.states_mut(user);
    }

    fn states_mut(&mut self, user: &UserId) -> &mut UserStates {
        let states = self.users.entry(user.clone()).or_default();
        for node in self.graph.nodes() {
            states
                .entry(node.id.clone())
                .or_insert_with(|| UserSkillState::locked(node.id.clone()));
        }
        states
    }

    fn entry(&mut self, user: &UserId, id: &SkillId) -> &mut UserSkillState {
        self.states_mut(user)
            .entry(id.clone())
            .or_insert_with(|| UserSkillState::locked(id.clone()))
    }

    /// The stored record; a pair never observed reads as locked at 0%.
    pub fn record(&self, user: &UserId, id: &SkillId) -> Result<UserSkillState, TransitionError> {
        self.ensure_known(id)?;
        Ok(self
            .stored(user, id)
            .cloned()
            .unwrap_or_else(|| UserSkillState::locked(id.clone())))
    }

    /// Direct prerequisites of `id` the user has not completed.
    pub fn missing_prerequisites(&self, user: &UserId, id: &SkillId) -> Vec<SkillId> {
        self.graph
            .prerequisites(id)
            .iter()
            .filter(|p| !self.is_completed(user, p))
            .cloned()
            .collect()
    }

    /// Derived state, including `Unlockable`.
    pub fn state(&self, user: &UserId, id: &SkillId) -> Result<UnlockState, TransitionError> {
        let record = self.record(user, id)?;
        Ok(match record.stored_state() {
            UnlockState::Locked if self.missing_prerequisites(user, id).is_empty() => {
                UnlockState::Unlockable
            }
            stored => stored,
        })
    }

    /// Derived state of every node for one user.
    pub fn view(&self, user: &UserId) -> ProgressView {
        ProgressView::new(
            self.graph
                .nodes()
                .iter()
                .map(|node| {
                    let state = self.state(user, &node.id).unwrap_or(UnlockState::Locked);
                    (node.id.clone(), state)
                })
                .collect(),
        )
    }

    /// Every record for one user, in graph order.
    pub fn snapshot(&self, user: &UserId) -> Vec<UserSkillState> {
        self.graph
            .nodes()
            .iter()
            .map(|node| {
                self.stored(user, &node.id)
                    .cloned()
                    .unwrap_or_else(|| UserSkillState::locked(node.id.clone()))
            })
            .collect()
    }

    /// Validate an unlock without applying it.
    pub fn check_unlock(&self, user: &UserId, id: &SkillId) -> Result<(), TransitionError> {
        self.ensure_known(id)?;
        let missing = self.missing_prerequisites(user, id);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TransitionError::PrerequisitesIncomplete {
                skill: id.clone(),
                missing,
            })
        }
    }

    /// Validate a completion without applying it.
    pub fn check_complete(&self, user: &UserId, id: &SkillId) -> Result<(), TransitionError> {
        let record = self.record(user, id)?;
        if record.is_unlocked {
            Ok(())
        } else {
            Err(TransitionError::NotUnlocked(id.clone()))
        }
    }

    /// Unlock a node whose prerequisites are all completed. Unlocking an
    /// already unlocked node succeeds without change.
    pub fn unlock(&mut self, user: &UserId, id: &SkillId) -> Result<UserSkillState, TransitionError> {
        self.check_unlock(user, id)?;

        let record = self.entry(user, id);
        if !record.is_unlocked {
            record.is_unlocked = true;
            record.updated_at = Some(Utc::now());
            tracing::debug!(user = %user, skill = %id, "Skill unlocked");
        }
        Ok(record.clone())
    }

    /// Complete an unlocked node, accumulating the session metrics.
    /// Completing an already completed node succeeds without change.
    pub fn complete(
        &mut self,
        user: &UserId,
        id: &SkillId,
        metrics: &CompletionMetrics,
    ) -> Result<UserSkillState, TransitionError> {
        self.check_complete(user, id)?;

        let record = self.entry(user, id);
        if !record.is_completed {
            record.is_completed = true;
            record.completion_progress = 100;
            record.metrics.accumulate(metrics);
            record.updated_at = Some(Utc::now());
            tracing::debug!(user = %user, skill = %id, "Skill completed");
        }
        Ok(record.clone())
    }

    /// Record partial progress (1..=99) on an unlocked, incomplete node.
    pub fn record_progress(
        &mut self,
        user: &UserId,
        id: &SkillId,
        progress: u8,
    ) -> Result<UserSkillState, TransitionError> {
        let current = self.record(user, id)?;
        if current.is_completed {
            return Err(TransitionError::AlreadyCompleted(id.clone()));
        }
        if !current.is_unlocked {
            return Err(TransitionError::NotUnlocked(id.clone()));
        }
        if progress == 0 || progress >= 100 {
            return Err(TransitionError::InvalidProgress {
                skill: id.clone(),
                progress,
            });
        }

        let record = self.entry(user, id);
        record.completion_progress = progress;
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    /// Direct dependents of `id` that are now `Unlockable` for the user.
    pub fn unlockable_dependents(&self, user: &UserId, id: &SkillId) -> Vec<SkillId> {
        self.graph
            .dependents(id)
            .iter()
            .filter(|d| matches!(self.state(user, d), Ok(UnlockState::Unlockable)))
            .cloned()
            .collect()
    }

    /// Replace a user's state with records from the status feed.
    ///
    /// Records for skills outside the graph are ignored. Records that break
    /// an invariant are repaired: completion forces unlock, and nodes
    /// unlocked over incomplete prerequisites are demoted until no further
    /// demotion applies.
    pub fn hydrate(
        &mut self,
        user: &UserId,
        records: impl IntoIterator<Item = UserSkillState>,
    ) -> HydrationReport {
        let mut report = HydrationReport::default();
        let mut states: UserStates = self
            .graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), UserSkillState::locked(n.id.clone())))
            .collect();

        for mut record in records {
            if !self.graph.contains(&record.skill_id) {
                tracing::warn!(
                    user = %user,
                    skill = %record.skill_id,
                    "Ignoring status record for unknown skill"
                );
                report.unknown.push(record.skill_id);
                continue;
            }

            if record.is_completed && !record.is_unlocked {
                record.is_unlocked = true;
                report.repairs.push(StateRepair::UnlockedForCompletion {
                    skill_id: record.skill_id.clone(),
                });
            }
            // Partial progress exists only between unlock and completion.
            let expected = if record.is_completed {
                100
            } else if !record.is_unlocked {
                0
            } else {
                record.completion_progress.min(99)
            };
            if record.completion_progress != expected {
                report.repairs.push(StateRepair::ProgressClamped {
                    skill_id: record.skill_id.clone(),
                    from: record.completion_progress,
                    to: expected,
                });
                record.completion_progress = expected;
            }

            states.insert(record.skill_id.clone(), record);
            report.applied += 1;
        }

        report.repairs.extend(enforce_gating(&self.graph, &mut states));
        self.users.insert(user.clone(), states);

        tracing::debug!(
            user = %user,
            applied = report.applied,
            unknown = report.unknown.len(),
            repairs = report.repairs.len(),
            "Progress hydrated"
        );
        report
    }

    /// Swap to a new merged graph.
    ///
    /// State for surviving nodes is kept, state for removed nodes is dropped
    /// (reported as `unknown`), and gating is re-validated.
    pub fn rebind(&mut self, graph: Arc<SkillGraph>) -> HydrationReport {
        self.graph = graph;
        let graph = Arc::clone(&self.graph);
        let mut report = HydrationReport::default();

        for (user, states) in self.users.iter_mut() {
            states.retain(|id, _| {
                let keep = graph.contains(id);
                if !keep {
                    report.unknown.push(id.clone());
                }
                keep
            });
            for node in graph.nodes() {
                states
                    .entry(node.id.clone())
                    .or_insert_with(|| UserSkillState::locked(node.id.clone()));
            }
            report.applied += states.len();

            let repairs = enforce_gating(&graph, states);
            if !repairs.is_empty() {
                tracing::warn!(user = %user, repairs = repairs.len(), "State repaired after graph rebind");
            }
            report.repairs.extend(repairs);
        }

        report.unknown.sort();
        report.unknown.dedup();
        report
    }

    /// Totals per display tier for one user.
    pub fn summary(
        &self,
        user: &UserId,
        ranks: &RankTable,
        resolver: &RankResolver,
    ) -> ProgressSummary {
        let mut buckets: BTreeMap<DisplayTier, TierTotals> = BTreeMap::new();
        let mut summary = ProgressSummary {
            user_id: user.clone(),
            total: 0,
            unlocked: 0,
            completed: 0,
            tiers: Vec::new(),
        };

        for node in self.graph.nodes() {
            let rank = ranks
                .rank_of(&node.id)
                .unwrap_or_else(|| RankResolver::tier_rank(node.difficulty_tier));
            let tier = resolver.normalize_rank(rank);
            let bucket = buckets.entry(tier).or_insert(TierTotals {
                tier,
                total: 0,
                unlocked: 0,
                completed: 0,
            });

            let (unlocked, completed) = self
                .stored(user, &node.id)
                .map_or((false, false), |s| (s.is_unlocked, s.is_completed));

            bucket.total += 1;
            summary.total += 1;
            if unlocked {
                bucket.unlocked += 1;
                summary.unlocked += 1;
            }
            if completed {
                bucket.completed += 1;
                summary.completed += 1;
            }
        }

        summary.tiers = buckets.into_values().collect();
        summary
    }
}

/// Demote unlocked nodes whose prerequisites are not all completed, in
/// topological order, until nothing changes.
fn enforce_gating(graph: &SkillGraph, states: &mut UserStates) -> Vec<StateRepair> {
    let order: Vec<SkillId> = match graph.topological_order() {
        Ok(order) => order.into_iter().cloned().collect(),
        Err(_) => graph.nodes().iter().map(|n| n.id.clone()).collect(),
    };

    let mut repairs = Vec::new();
    loop {
        let mut changed = false;
        for id in &order {
            if !states.get(id).is_some_and(|s| s.is_unlocked) {
                continue;
            }
            let missing: Vec<SkillId> = graph
                .prerequisites(id)
                .iter()
                .filter(|p| !states.get(*p).is_some_and(|s| s.is_completed))
                .cloned()
                .collect();
            if missing.is_empty() {
                continue;
            }

            if let Some(state) = states.get_mut(id) {
                state.is_unlocked = false;
                state.is_completed = false;
                state.completion_progress = 0;
            }
            tracing::warn!(skill = %id, missing = ?missing, "Demoted skill with incomplete prerequisites");
            repairs.push(StateRepair::Demoted {
                skill_id: id.clone(),
                missing,
            });
            changed = true;
        }
        if !changed {
            break;
        }
    }
    repairs
}
