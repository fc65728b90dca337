//! Skill feed loaders.
//!
//! The primary feed is a JSON array of structured records; the secondary
//! feed is a directory of markdown documents with YAML frontmatter. Both
//! produce source records for `skilltree_core::graph::GraphMerger`.

pub mod primary;
pub mod secondary;

use std::path::Path;

use anyhow::Context;
use skilltree_types::skill::{PrimarySkill, SecondarySkill};

pub use primary::{load_primary_feed, parse_primary_feed};
pub use secondary::{load_secondary_feed, parse_secondary_document, SecondaryFeed};

/// Both feeds, ready to merge.
#[derive(Debug, Clone, Default)]
pub struct LoadedFeeds {
    pub primary: Vec<PrimarySkill>,
    pub secondary: Vec<SecondarySkill>,
    /// Secondary documents that could not be parsed, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Load the primary feed file and the secondary feed directory.
///
/// A missing secondary directory is treated as an empty feed.
pub async fn load_feeds(primary_path: &Path, secondary_dir: &Path) -> anyhow::Result<LoadedFeeds> {
    let primary = load_primary_feed(primary_path)
        .await
        .with_context(|| format!("Failed to load primary feed {}", primary_path.display()))?;
    let secondary = load_secondary_feed(secondary_dir)
        .await
        .with_context(|| format!("Failed to load secondary feed {}", secondary_dir.display()))?;

    Ok(LoadedFeeds {
        primary,
        secondary: secondary.skills,
        skipped: secondary.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_feeds_reads_both_sources() {
        let tmp = TempDir::new().unwrap();
        let primary = tmp.path().join("primary.json");
        let secondary = tmp.path().join("secondary");
        tokio::fs::create_dir_all(&secondary).await.unwrap();
        tokio::fs::write(
            &primary,
            r#"[{"id": "pull-01", "name": "Dominadas", "branch": "pull", "difficulty_tier": "beginner"}]"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            secondary.join("muscle-up.md"),
            "---\nname: Muscle-up\nbranch: pull\n---\n## Prerequisites\n- Dominadas\n",
        )
        .await
        .unwrap();
        tokio::fs::write(secondary.join("broken.md"), "no frontmatter").await.unwrap();

        let feeds = load_feeds(&primary, &secondary).await.unwrap();
        assert_eq!(feeds.primary.len(), 1);
        assert_eq!(feeds.secondary.len(), 1);
        assert_eq!(feeds.secondary[0].prerequisites, vec!["Dominadas"]);
        assert_eq!(feeds.skipped.len(), 1);
        assert_eq!(feeds.skipped[0].0, "broken.md");
    }

    #[tokio::test]
    async fn test_load_feeds_without_secondary_dir() {
        let tmp = TempDir::new().unwrap();
        let primary = tmp.path().join("primary.json");
        tokio::fs::write(&primary, "[]").await.unwrap();

        let feeds = load_feeds(&primary, &tmp.path().join("absent")).await.unwrap();
        assert!(feeds.primary.is_empty());
        assert!(feeds.secondary.is_empty());
    }
}
