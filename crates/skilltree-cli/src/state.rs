//! Application state shared by the CLI commands.
//!
//! Loads configuration, reads and merges both skill feeds, and pins the
//! progress ports to the file-backed store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use skilltree_core::graph::{GraphMerger, SkillGraph};
use skilltree_core::progress::{HydrationReport, ProgressTracker};
use skilltree_core::rank::{RankResolver, RankTable};
use skilltree_core::repository::StatusFeed;
use skilltree_infra::config::load_config;
use skilltree_infra::feed::load_feeds;
use skilltree_infra::filesystem::{primary_feed_path, resolve_data_dir, secondary_feed_dir};
use skilltree_infra::status::FileStatusStore;
use skilltree_types::config::SkillTreeConfig;
use skilltree_types::error::MergeWarning;
use skilltree_types::progress::UserId;
use skilltree_types::skill::{SkillId, SkillNode};

/// Where to read the feeds from; `None` means the data directory default.
#[derive(Debug, Clone, Default)]
pub struct FeedPaths {
    pub data_dir: Option<PathBuf>,
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: SkillTreeConfig,
    pub graph: Arc<SkillGraph>,
    pub warnings: Vec<MergeWarning>,
    /// Secondary documents that could not be parsed.
    pub skipped: Vec<(String, String)>,
    pub resolver: RankResolver,
    pub ranks: RankTable,
    pub store: FileStatusStore,
}

impl AppState {
    /// Load config and feeds and merge them.
    pub async fn init(paths: FeedPaths) -> Result<Self> {
        let data_dir = paths.data_dir.unwrap_or_else(resolve_data_dir);
        let config = load_config(&data_dir).await;

        let primary = paths.primary.unwrap_or_else(|| primary_feed_path(&data_dir));
        let secondary = paths.secondary.unwrap_or_else(|| secondary_feed_dir(&data_dir));
        let feeds = load_feeds(&primary, &secondary).await?;

        let outcome = GraphMerger::new().merge(&feeds.primary, &feeds.secondary);
        let graph = Arc::new(outcome.graph);
        let resolver = RankResolver::from_config(&config);
        let ranks = resolver.resolve_all(&graph);

        Ok(Self {
            store: FileStatusStore::new(&data_dir),
            data_dir,
            config,
            graph,
            warnings: outcome.warnings,
            skipped: feeds.skipped,
            resolver,
            ranks,
        })
    }

    /// Resolve a command-line skill argument (id or display name).
    pub fn skill(&self, reference: &str) -> Result<&SkillNode> {
        self.graph
            .find(reference)
            .with_context(|| format!("Unknown skill '{reference}'"))
    }

    pub fn skill_name<'a>(&'a self, id: &'a SkillId) -> &'a str {
        self.graph.get(id).map(|n| n.name.as_str()).unwrap_or(id.as_str())
    }

    /// A tracker hydrated from the stored status records of `user`.
    pub async fn load_tracker(&self, user: &UserId) -> Result<(ProgressTracker, HydrationReport)> {
        let records = self
            .store
            .fetch_statuses(user)
            .await
            .with_context(|| format!("Failed to load progress for '{user}'"))?;

        let mut tracker = ProgressTracker::new(Arc::clone(&self.graph));
        let report = tracker.hydrate(user, records);
        Ok((tracker, report))
    }
}
