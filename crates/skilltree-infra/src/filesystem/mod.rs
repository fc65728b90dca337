//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   feeds/primary.json
//!   feeds/secondary/*.md
//!   progress/{user}.json
//!   progress/{user}.intents.jsonl
//! ```

use std::path::{Path, PathBuf};

/// Default location of the primary feed.
pub fn primary_feed_path(data_dir: &Path) -> PathBuf {
    data_dir.join("feeds").join("primary.json")
}

/// Default directory of secondary feed documents.
pub fn secondary_feed_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("feeds").join("secondary")
}

pub fn progress_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("progress")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SKILLTREE_DATA_DIR` environment variable
/// 2. `~/.skilltree` in the user's home directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SKILLTREE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".skilltree");
    }

    // Last resort: current directory
    PathBuf::from(".skilltree")
}
