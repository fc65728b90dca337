//! Debounced recompute queue.
//!
//! Producers post [`RecomputeSignal`]s as things change; identical signals
//! coalesce. A batch is released only once the debounce window has passed
//! since the most recent post, so a burst of resizes or geometry reports
//! collapses into a single recompute. Each released batch carries a new
//! generation number; results computed for an older generation are stale.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use skilltree_types::config::SkillTreeConfig;
use skilltree_types::event::RecomputeSignal;

/// Signals released together for one recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeBatch {
    pub generation: u64,
    /// Distinct signals, in signal order.
    pub signals: Vec<RecomputeSignal>,
    /// Number of posts coalesced into this batch.
    pub signal_count: usize,
}

impl RecomputeBatch {
    /// Whether lane ordering must be recomputed for this batch.
    pub fn affects_ordering(&self) -> bool {
        self.signals.iter().any(RecomputeSignal::affects_ordering)
    }
}

/// Single-queue debouncer for layout and routing recomputes.
#[derive(Debug, Clone)]
pub struct RecomputeScheduler {
    debounce: Duration,
    pending: BTreeSet<RecomputeSignal>,
    posted: usize,
    last_post: Option<Instant>,
    generation: u64,
}

impl Default for RecomputeScheduler {
    fn default() -> Self {
        Self::from_config(&SkillTreeConfig::default())
    }
}

impl RecomputeScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: BTreeSet::new(),
            posted: 0,
            last_post: None,
            generation: 0,
        }
    }

    pub fn from_config(config: &SkillTreeConfig) -> Self {
        Self::new(Duration::from_millis(config.recompute_debounce_ms))
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue a signal; restarts the debounce window.
    pub fn post(&mut self, signal: RecomputeSignal, now: Instant) {
        self.pending.insert(signal);
        self.posted += 1;
        self.last_post = Some(now);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// When the pending batch becomes releasable, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_post.map(|t| t + self.debounce)
    }

    /// Release the pending batch if the window since the last post has
    /// elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<RecomputeBatch> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.release()
    }

    /// Release whatever is pending without waiting.
    pub fn flush(&mut self) -> Option<RecomputeBatch> {
        self.release()
    }

    fn release(&mut self) -> Option<RecomputeBatch> {
        if self.pending.is_empty() {
            return None;
        }
        self.generation += 1;
        let batch = RecomputeBatch {
            generation: self.generation,
            signals: std::mem::take(&mut self.pending).into_iter().collect(),
            signal_count: std::mem::take(&mut self.posted),
        };
        self.last_post = None;

        tracing::debug!(
            generation = batch.generation,
            signals = batch.signals.len(),
            posted = batch.signal_count,
            "Recompute batch released"
        );
        Some(batch)
    }

    /// Generation of the most recently released batch (0 before any).
    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Whether a result computed for `generation` is still the latest.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}
