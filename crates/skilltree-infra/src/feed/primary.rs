//! Primary feed: a JSON array of structured skill records.

use std::path::Path;

use anyhow::Context;
use skilltree_types::error::FeedError;
use skilltree_types::skill::PrimarySkill;

/// Parse the primary feed document.
pub fn parse_primary_feed(json: &str) -> Result<Vec<PrimarySkill>, FeedError> {
    serde_json::from_str(json).map_err(|e| FeedError::Malformed {
        document: "primary feed".to_string(),
        reason: e.to_string(),
    })
}

/// Read and parse the primary feed file.
pub async fn load_primary_feed(path: &Path) -> anyhow::Result<Vec<PrimarySkill>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let skills = parse_primary_feed(&content)?;
    tracing::debug!(path = %path.display(), records = skills.len(), "Primary feed loaded");
    Ok(skills)
}
