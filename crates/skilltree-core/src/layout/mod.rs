//! Lane layout, measured geometry and connector routing.
//!
//! The engine groups nodes into one lane per branch and orders them
//! deterministically. Positions are never computed here: the rendering
//! surface measures each node and reports its box into the
//! [`GeometryRegistry`], and the router anchors connectors on those boxes.

pub mod engine;
pub mod geometry;
pub mod router;

pub use engine::{LayoutEngine, TreeLayout};
pub use geometry::GeometryRegistry;
pub use router::{ConnectorRouter, DeferredEdge, RouteReport};
