//! Progress ports.
//!
//! The status feed hands back a user's persisted per-skill records; the
//! progress gateway accepts unlock/complete intents and acknowledges them.
//! Implementations live in skilltree-infra (e.g., `FileStatusStore`).

use skilltree_types::error::RepositoryError;
use skilltree_types::progress::{IntentAck, IntentEnvelope, UserId, UserSkillState};

/// Source of persisted per-user skill state.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait StatusFeed: Send + Sync {
    /// Fetch every stored record for a user. An unknown user yields an
    /// empty list, not an error.
    fn fetch_statuses(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<UserSkillState>, RepositoryError>> + Send;
}

/// Outbound channel for progress intents.
pub trait ProgressGateway: Send + Sync {
    /// Deliver an intent. `Ok` with `accepted == false` is a rejection by the
    /// backend; `Err` means the intent never arrived.
    fn send_intent(
        &self,
        envelope: &IntentEnvelope,
    ) -> impl std::future::Future<Output = Result<IntentAck, RepositoryError>> + Send;
}
