//! File-backed progress store.
//!
//! Per-user status records live at `{data_dir}/progress/{user}.json` as a
//! JSON array of `UserSkillState`. Intents are appended to
//! `{data_dir}/progress/{user}.intents.jsonl` and always acknowledged, so
//! the store doubles as a local stand-in for the progress backend.

use std::path::PathBuf;

use skilltree_core::repository::{ProgressGateway, StatusFeed};
use skilltree_types::error::RepositoryError;
use skilltree_types::progress::{IntentAck, IntentEnvelope, UserId, UserSkillState};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct FileStatusStore {
    progress_dir: PathBuf,
}

impl FileStatusStore {
    /// Create a store rooted at `data_dir`; records go under `progress/`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            progress_dir: crate::filesystem::progress_dir(&data_dir.into()),
        }
    }

    /// User ids become file names, so only a conservative alphabet is allowed.
    fn user_file(&self, user: &UserId, suffix: &str) -> Result<PathBuf, RepositoryError> {
        let id = user.as_str();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
        if !valid {
            return Err(RepositoryError::Query(format!("invalid user id: '{id}'")));
        }
        Ok(self.progress_dir.join(format!("{id}{suffix}")))
    }

    pub fn status_path(&self, user: &UserId) -> Result<PathBuf, RepositoryError> {
        self.user_file(user, ".json")
    }

    pub fn intents_path(&self, user: &UserId) -> Result<PathBuf, RepositoryError> {
        self.user_file(user, ".intents.jsonl")
    }

    /// Persist a user's records, replacing the previous file atomically.
    pub async fn store_statuses(
        &self,
        user: &UserId,
        records: &[UserSkillState],
    ) -> Result<(), RepositoryError> {
        let path = self.status_path(user)?;
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tokio::fs::create_dir_all(&self.progress_dir)
            .await
            .map_err(|e| RepositoryError::Query(format!("create progress dir: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RepositoryError::Query(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| RepositoryError::Query(format!("replace {}: {e}", path.display())))?;

        tracing::debug!(user = %user, records = records.len(), "Progress stored");
        Ok(())
    }

    /// Every intent logged for a user, oldest first.
    pub async fn logged_intents(&self, user: &UserId) -> Result<Vec<IntentEnvelope>, RepositoryError> {
        let path = self.intents_path(user)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::Query(format!("read {}: {e}", path.display()))),
        };

        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .map_err(|e| RepositoryError::Query(format!("invalid intent line: {e}")))
            })
            .collect()
    }
}

impl StatusFeed for FileStatusStore {
    async fn fetch_statuses(&self, user: &UserId) -> Result<Vec<UserSkillState>, RepositoryError> {
        let path = self.status_path(user)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(user = %user, "No stored progress, starting fresh");
                return Ok(Vec::new());
            }
            Err(e) => return Err(RepositoryError::Query(format!("read {}: {e}", path.display()))),
        };

        serde_json::from_str(&content)
            .map_err(|e| RepositoryError::Query(format!("invalid status JSON in {}: {e}", path.display())))
    }
}

impl ProgressGateway for FileStatusStore {
    async fn send_intent(&self, envelope: &IntentEnvelope) -> Result<IntentAck, RepositoryError> {
        let path = self.intents_path(&envelope.user_id)?;
        let mut line =
            serde_json::to_string(envelope).map_err(|e| RepositoryError::Query(e.to_string()))?;
        line.push('\n');

        tokio::fs::create_dir_all(&self.progress_dir)
            .await
            .map_err(|_| RepositoryError::Connection)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|_| RepositoryError::Connection)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|_| RepositoryError::Connection)?;
        file.flush().await.map_err(|_| RepositoryError::Connection)?;

        Ok(IntentAck {
            intent_id: envelope.intent_id,
            accepted: true,
            reason: None,
        })
    }
}
