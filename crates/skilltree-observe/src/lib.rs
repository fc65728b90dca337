//! Observability setup for the skill tree binaries.

pub mod tracing_setup;
