//! Event bus for live skill tree updates.
//!
//! Provides an `EventBus` that distributes `TreeEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
