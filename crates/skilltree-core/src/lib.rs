//! Skill graph logic and repository trait definitions for the skill tree.
//!
//! This crate merges the skill feeds, derives ranks, tracks per-user
//! progress, lays out lanes and routes connectors. It also defines the
//! "ports" (repository traits) that the infrastructure layer implements. It
//! depends only on `skilltree-types` -- never on `skilltree-infra` or any
//! IO crate.

pub mod event;
pub mod graph;
pub mod layout;
pub mod progress;
pub mod rank;
pub mod repository;
pub mod scheduler;
pub mod view;
