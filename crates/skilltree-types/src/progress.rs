//! Per-user progression state and the intents exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::skill::SkillId;

/// Identifier of a user as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Training metrics accumulated while working on a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionMetrics {
    #[serde(default)]
    pub total_reps: u32,
    #[serde(default)]
    pub total_hold_secs: u32,
    #[serde(default)]
    pub sessions: u32,
}

impl CompletionMetrics {
    /// Add another batch of metrics, saturating on overflow.
    pub fn accumulate(&mut self, other: &CompletionMetrics) {
        self.total_reps = self.total_reps.saturating_add(other.total_reps);
        self.total_hold_secs = self.total_hold_secs.saturating_add(other.total_hold_secs);
        self.sessions = self.sessions.saturating_add(other.sessions);
    }
}

/// Persisted per-user, per-node status. Also the record shape of the status feed.
///
/// Invariants (enforced by the tracker, repaired on hydration):
/// - `is_completed` implies `is_unlocked`
/// - `is_unlocked` only when every prerequisite is completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSkillState {
    pub skill_id: SkillId,
    pub is_unlocked: bool,
    pub is_completed: bool,
    /// 0 through 100.
    pub completion_progress: u8,
    #[serde(default)]
    pub metrics: CompletionMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSkillState {
    /// Default state for a node the user has never been observed against.
    pub fn locked(skill_id: SkillId) -> Self {
        Self {
            skill_id,
            is_unlocked: false,
            is_completed: false,
            completion_progress: 0,
            metrics: CompletionMetrics::default(),
            updated_at: None,
        }
    }

    /// The stored part of the state machine. `Unlockable` is never stored;
    /// it is derived against the graph on read.
    pub fn stored_state(&self) -> UnlockState {
        if self.is_completed {
            UnlockState::Completed
        } else if self.is_unlocked {
            UnlockState::Unlocked
        } else {
            UnlockState::Locked
        }
    }
}

/// Unlock state machine: `Locked -> Unlockable -> Unlocked -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockState {
    Locked,
    /// Not unlocked yet, but every prerequisite is completed.
    Unlockable,
    Unlocked,
    Completed,
}

impl UnlockState {
    pub fn is_unlocked(self) -> bool {
        matches!(self, UnlockState::Unlocked | UnlockState::Completed)
    }
}

impl fmt::Display for UnlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockState::Locked => write!(f, "locked"),
            UnlockState::Unlockable => write!(f, "unlockable"),
            UnlockState::Unlocked => write!(f, "unlocked"),
            UnlockState::Completed => write!(f, "completed"),
        }
    }
}

/// Outbound request toward the backend. Applied locally only after an ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressIntent {
    Unlock {
        skill_id: SkillId,
    },
    Complete {
        skill_id: SkillId,
        metrics: CompletionMetrics,
    },
}

impl ProgressIntent {
    pub fn skill_id(&self) -> &SkillId {
        match self {
            ProgressIntent::Unlock { skill_id } | ProgressIntent::Complete { skill_id, .. } => {
                skill_id
            }
        }
    }
}

/// An intent addressed to a user, with a time-sortable id for acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentEnvelope {
    pub intent_id: Uuid,
    pub user_id: UserId,
    pub intent: ProgressIntent,
    pub issued_at: DateTime<Utc>,
}

impl IntentEnvelope {
    pub fn new(user_id: UserId, intent: ProgressIntent) -> Self {
        Self {
            intent_id: Uuid::now_v7(),
            user_id,
            intent,
            issued_at: Utc::now(),
        }
    }
}

/// Backend acknowledgement of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAck {
    pub intent_id: Uuid,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_default() {
        let state = UserSkillState::locked(SkillId::from("a"));
        assert!(!state.is_unlocked);
        assert!(!state.is_completed);
        assert_eq!(state.completion_progress, 0);
        assert_eq!(state.stored_state(), UnlockState::Locked);
    }

    #[test]
    fn test_status_feed_record_deserialize_without_metrics() {
        let json = r#"{"skill_id": "pull-01", "is_unlocked": true, "is_completed": false, "completion_progress": 40}"#;
        let state: UserSkillState = serde_json::from_str(json).unwrap();
        assert_eq!(state.stored_state(), UnlockState::Unlocked);
        assert_eq!(state.metrics, CompletionMetrics::default());
    }

    #[test]
    fn test_metrics_accumulate_saturates() {
        let mut m = CompletionMetrics {
            total_reps: u32::MAX - 1,
            total_hold_secs: 10,
            sessions: 1,
        };
        m.accumulate(&CompletionMetrics {
            total_reps: 5,
            total_hold_secs: 20,
            sessions: 1,
        });
        assert_eq!(m.total_reps, u32::MAX);
        assert_eq!(m.total_hold_secs, 30);
        assert_eq!(m.sessions, 2);
    }

    #[test]
    fn test_intent_serde_tagged() {
        let intent = ProgressIntent::Unlock {
            skill_id: SkillId::from("pull-02"),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "unlock");
        assert_eq!(json["skill_id"], "pull-02");
    }
}
