//! Outbound progress intents with an optimistic display overlay.
//!
//! Each unlock or complete is validated locally, shown optimistically, sent
//! through the [`ProgressGateway`], and only applied to the tracker once
//! the gateway acknowledges it. A failed or rejected intent discards the
//! optimistic guess. Intents are handled one at a time in arrival order
//! (`tokio::sync::Mutex` is FIFO-fair).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use skilltree_types::error::TransitionError;
use skilltree_types::event::TreeEvent;
use skilltree_types::progress::{
    CompletionMetrics, IntentEnvelope, ProgressIntent, UnlockState, UserId, UserSkillState,
};
use skilltree_types::skill::SkillId;

use super::{ProgressTracker, ProgressView};
use crate::event::EventBus;
use crate::graph::SkillGraph;
use crate::repository::ProgressGateway;

type GuessKey = (UserId, SkillId);

/// Serializes progress intents for a shared [`ProgressTracker`].
pub struct ProgressSync<G: ProgressGateway> {
    gateway: G,
    tracker: RwLock<ProgressTracker>,
    /// Held for the whole validate/send/apply sequence of one intent.
    turn: Mutex<()>,
    guesses: RwLock<HashMap<GuessKey, UnlockState>>,
    events: Option<EventBus>,
}

impl<G: ProgressGateway> ProgressSync<G> {
    pub fn new(tracker: ProgressTracker, gateway: G) -> Self {
        Self {
            gateway,
            tracker: RwLock::new(tracker),
            turn: Mutex::new(()),
            guesses: RwLock::new(HashMap::new()),
            events: None,
        }
    }

    /// Publish state changes and rejections on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Read access to the authoritative tracker.
    pub async fn tracker(&self) -> tokio::sync::RwLockReadGuard<'_, ProgressTracker> {
        self.tracker.read().await
    }

    /// Replace the tracker's graph; see [`ProgressTracker::rebind`].
    pub async fn rebind(&self, graph: Arc<SkillGraph>) {
        let _turn = self.turn.lock().await;
        self.tracker.write().await.rebind(graph);
    }

    /// State to display: an in-flight guess if one exists, otherwise the
    /// tracker's derived state.
    pub async fn display_state(
        &self,
        user: &UserId,
        id: &SkillId,
    ) -> Result<UnlockState, TransitionError> {
        if let Some(guess) = self.guesses.read().await.get(&(user.clone(), id.clone())) {
            return Ok(*guess);
        }
        self.tracker.read().await.state(user, id)
    }

    /// Derived state of every node with in-flight guesses overlaid.
    pub async fn display_view(&self, user: &UserId) -> ProgressView {
        let mut view = self.tracker.read().await.view(user);
        for ((guess_user, id), state) in self.guesses.read().await.iter() {
            if guess_user == user {
                view.set(id.clone(), *state);
            }
        }
        view
    }

    /// Unlock through the gateway. Already unlocked nodes succeed without
    /// sending an intent.
    pub async fn unlock(&self, user: &UserId, id: &SkillId) -> Result<UserSkillState, TransitionError> {
        let _turn = self.turn.lock().await;

        {
            let tracker = self.tracker.read().await;
            let current = tracker.record(user, id)?;
            if current.is_unlocked {
                return Ok(current);
            }
            if let Err(err) = tracker.check_unlock(user, id) {
                self.publish_rejection(user, id, &err);
                return Err(err);
            }
        }

        let intent = ProgressIntent::Unlock {
            skill_id: id.clone(),
        };
        self.deliver(user, intent, UnlockState::Unlocked).await?;

        let result = self.tracker.write().await.unlock(user, id);
        self.finish(user, id, result)
    }

    /// Complete through the gateway. Already completed nodes succeed without
    /// sending an intent.
    pub async fn complete(
        &self,
        user: &UserId,
        id: &SkillId,
        metrics: CompletionMetrics,
    ) -> Result<UserSkillState, TransitionError> {
        let _turn = self.turn.lock().await;

        {
            let tracker = self.tracker.read().await;
            let current = tracker.record(user, id)?;
            if current.is_completed {
                return Ok(current);
            }
            if let Err(err) = tracker.check_complete(user, id) {
                self.publish_rejection(user, id, &err);
                return Err(err);
            }
        }

        let intent = ProgressIntent::Complete {
            skill_id: id.clone(),
            metrics,
        };
        self.deliver(user, intent, UnlockState::Completed).await?;

        let result = self.tracker.write().await.complete(user, id, &metrics);
        self.finish(user, id, result)
    }

    /// Record the guess, send the intent, and clear the guess whatever the
    /// outcome.
    async fn deliver(
        &self,
        user: &UserId,
        intent: ProgressIntent,
        guess: UnlockState,
    ) -> Result<(), TransitionError> {
        let id = intent.skill_id().clone();
        let key = (user.clone(), id.clone());
        self.guesses.write().await.insert(key.clone(), guess);

        let envelope = IntentEnvelope::new(user.clone(), intent);
        let outcome = self.gateway.send_intent(&envelope).await;

        self.guesses.write().await.remove(&key);

        let err = match outcome {
            Ok(ack) if ack.accepted => {
                tracing::debug!(
                    user = %user,
                    skill = %id,
                    intent_id = %envelope.intent_id,
                    "Progress intent accepted"
                );
                return Ok(());
            }
            Ok(ack) => TransitionError::Rejected {
                skill: id.clone(),
                reason: ack.reason.unwrap_or_else(|| "no reason given".to_string()),
            },
            Err(e) => TransitionError::Delivery {
                skill: id.clone(),
                reason: e.to_string(),
            },
        };

        tracing::warn!(
            user = %user,
            skill = %id,
            intent_id = %envelope.intent_id,
            error = %err,
            "Progress intent failed; optimistic state reverted"
        );
        self.publish_rejection(user, &id, &err);
        Err(err)
    }

    fn finish(
        &self,
        user: &UserId,
        id: &SkillId,
        result: Result<UserSkillState, TransitionError>,
    ) -> Result<UserSkillState, TransitionError> {
        match &result {
            Ok(record) => {
                if let Some(bus) = &self.events {
                    bus.publish(TreeEvent::SkillStateChanged {
                        user_id: user.clone(),
                        skill_id: id.clone(),
                        state: record.stored_state(),
                    });
                }
            }
            Err(err) => self.publish_rejection(user, id, err),
        }
        result
    }

    fn publish_rejection(&self, user: &UserId, id: &SkillId, err: &TransitionError) {
        if let Some(bus) = &self.events {
            bus.publish(TreeEvent::TransitionRejected {
                user_id: user.clone(),
                skill_id: id.clone(),
                reason: err.to_string(),
            });
        }
    }
}

impl<G: ProgressGateway> std::fmt::Debug for ProgressSync<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSync")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use skilltree_types::error::RepositoryError;
    use skilltree_types::progress::IntentAck;
    use skilltree_types::skill::{Attributes, Branch, DifficultyTier, NodeOrigin, SkillNode};
    use tokio::sync::{oneshot, Notify};

    fn node(id: &str, prereqs: &[&str]) -> SkillNode {
        SkillNode {
            id: SkillId::from(id),
            name: id.to_string(),
            branch: Branch::Pull,
            difficulty_tier: DifficultyTier::Beginner,
            rank_override: None,
            prerequisites: prereqs.iter().map(|p| SkillId::from(*p)).collect(),
            supplemental_attributes: Attributes::new(),
            authoring_order: None,
            origin: NodeOrigin::Primary,
            aliases: Vec::new(),
        }
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(Arc::new(
            SkillGraph::try_from_nodes(vec![node("dominadas", &[]), node("muscle-up", &["dominadas"])])
                .unwrap(),
        ))
    }

    enum Reply {
        Accept,
        Reject,
        Fail,
    }

    struct ScriptedGateway {
        reply: Reply,
        sent: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                sent: AtomicUsize::new(0),
            }
        }
    }

    impl ProgressGateway for ScriptedGateway {
        async fn send_intent(&self, envelope: &IntentEnvelope) -> Result<IntentAck, RepositoryError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Accept => Ok(IntentAck {
                    intent_id: envelope.intent_id,
                    accepted: true,
                    reason: None,
                }),
                Reply::Reject => Ok(IntentAck {
                    intent_id: envelope.intent_id,
                    accepted: false,
                    reason: Some("season locked".to_string()),
                }),
                Reply::Fail => Err(RepositoryError::Connection),
            }
        }
    }

    /// Holds each intent until the test releases it.
    struct PausingGateway {
        arrived: Notify,
        release: Mutex<Option<oneshot::Receiver<bool>>>,
    }

    impl ProgressGateway for PausingGateway {
        async fn send_intent(&self, envelope: &IntentEnvelope) -> Result<IntentAck, RepositoryError> {
            self.arrived.notify_one();
            let rx = self.release.lock().await.take();
            let accepted = match rx {
                Some(rx) => rx.await.unwrap_or(false),
                None => false,
            };
            if accepted {
                Ok(IntentAck {
                    intent_id: envelope.intent_id,
                    accepted: true,
                    reason: None,
                })
            } else {
                Err(RepositoryError::Connection)
            }
        }
    }

    #[tokio::test]
    async fn test_accepted_unlock_applies_and_publishes() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let sync = ProgressSync::new(tracker(), ScriptedGateway::new(Reply::Accept)).with_event_bus(bus);
        let user = UserId::new("ana");
        let id = SkillId::from("dominadas");

        let record = sync.unlock(&user, &id).await.unwrap();
        assert!(record.is_unlocked);
        assert_eq!(sync.display_state(&user, &id).await.unwrap(), UnlockState::Unlocked);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            TreeEvent::SkillStateChanged {
                state: UnlockState::Unlocked,
                ..
            }
        ));

        // Already unlocked: no second intent.
        sync.unlock(&user, &id).await.unwrap();
        assert_eq!(sync.gateway().sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_validation_rejects_without_sending() {
        let sync = ProgressSync::new(tracker(), ScriptedGateway::new(Reply::Accept));
        let user = UserId::new("ana");

        let err = sync.unlock(&user, &SkillId::from("muscle-up")).await.unwrap_err();
        assert!(matches!(err, TransitionError::PrerequisitesIncomplete { .. }));
        assert_eq!(sync.gateway().sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_intent_leaves_state_unchanged() {
        let sync = ProgressSync::new(tracker(), ScriptedGateway::new(Reply::Reject));
        let user = UserId::new("ana");
        let id = SkillId::from("dominadas");

        let err = sync.unlock(&user, &id).await.unwrap_err();
        assert_eq!(
            err,
            TransitionError::Rejected {
                skill: id.clone(),
                reason: "season locked".to_string()
            }
        );
        assert_eq!(sync.display_state(&user, &id).await.unwrap(), UnlockState::Unlockable);
    }

    #[tokio::test]
    async fn test_delivery_failure_surfaces_error() {
        let sync = ProgressSync::new(tracker(), ScriptedGateway::new(Reply::Fail));
        let user = UserId::new("ana");
        let id = SkillId::from("dominadas");

        let err = sync.unlock(&user, &id).await.unwrap_err();
        assert!(matches!(err, TransitionError::Delivery { .. }));
        assert!(!sync.tracker().await.record(&user, &id).unwrap().is_unlocked);
    }

    #[tokio::test]
    async fn test_optimistic_guess_visible_in_flight_then_reverted() {
        let (release_tx, release_rx) = oneshot::channel();
        let gateway = PausingGateway {
            arrived: Notify::new(),
            release: Mutex::new(Some(release_rx)),
        };
        let sync = Arc::new(ProgressSync::new(tracker(), gateway));
        let user = UserId::new("ana");
        let id = SkillId::from("dominadas");

        let task = {
            let sync = Arc::clone(&sync);
            let user = user.clone();
            let id = id.clone();
            tokio::spawn(async move { sync.unlock(&user, &id).await })
        };

        sync.gateway().arrived.notified().await;
        assert_eq!(sync.display_state(&user, &id).await.unwrap(), UnlockState::Unlocked);
        assert!(sync.display_view(&user).await.is_unlocked(&id));
        assert_eq!(
            sync.tracker().await.state(&user, &id).unwrap(),
            UnlockState::Unlockable
        );

        release_tx.send(false).unwrap();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(TransitionError::Delivery { .. })));
        assert_eq!(sync.display_state(&user, &id).await.unwrap(), UnlockState::Unlockable);
    }

    #[tokio::test]
    async fn test_complete_through_gateway() {
        let sync = ProgressSync::new(tracker(), ScriptedGateway::new(Reply::Accept));
        let user = UserId::new("ana");
        let id = SkillId::from("dominadas");

        assert!(matches!(
            sync.complete(&user, &id, CompletionMetrics::default()).await,
            Err(TransitionError::NotUnlocked(_))
        ));

        sync.unlock(&user, &id).await.unwrap();
        let record = sync
            .complete(
                &user,
                &id,
                CompletionMetrics {
                    total_reps: 12,
                    total_hold_secs: 0,
                    sessions: 1,
                },
            )
            .await
            .unwrap();
        assert!(record.is_completed);
        assert_eq!(record.metrics.total_reps, 12);
        assert_eq!(
            sync.display_state(&user, &SkillId::from("muscle-up")).await.unwrap(),
            UnlockState::Unlockable
        );
    }
}
