//! Shared domain types for the skill tree engine.
//!
//! This crate contains the types used across the workspace: skill nodes and
//! their source records, rank scales, per-user progress state, layout and
//! connector geometry, events, configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod layout;
pub mod progress;
pub mod rank;
pub mod skill;
