//! Infrastructure layer for the skill tree.
//!
//! Contains implementations of the ports defined in `skilltree-core`: the
//! file-backed progress store, loaders for the primary (JSON) and secondary
//! (markdown + frontmatter) skill feeds, configuration loading and data
//! directory resolution.

pub mod config;
pub mod feed;
pub mod filesystem;
pub mod status;
