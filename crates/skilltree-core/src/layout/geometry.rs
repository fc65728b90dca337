//! Node-id-indexed store of measured bounding boxes.

use std::collections::{HashMap, HashSet};

use skilltree_types::error::GeometryError;
use skilltree_types::layout::BoundingBox;
use skilltree_types::skill::SkillId;

use crate::graph::SkillGraph;

/// Bounding boxes reported by the rendering surface, stored verbatim.
///
/// Only ids of the bound graph are accepted.
#[derive(Debug, Clone, Default)]
pub struct GeometryRegistry {
    known: HashSet<SkillId>,
    boxes: HashMap<SkillId, BoundingBox>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept ids of `graph` from now on, dropping boxes of nodes that no
    /// longer exist.
    pub fn bind(&mut self, graph: &SkillGraph) {
        self.known = graph.nodes().iter().map(|n| n.id.clone()).collect();
        let known = &self.known;
        self.boxes.retain(|id, _| known.contains(id));
    }

    /// Record a measured box for a node, replacing any earlier report.
    pub fn report(&mut self, id: &SkillId, bounds: BoundingBox) -> Result<(), GeometryError> {
        if !self.known.contains(id) {
            return Err(GeometryError::UnknownNode(id.clone()));
        }
        if !bounds.is_valid() {
            return Err(GeometryError::InvalidBounds(id.clone()));
        }
        self.boxes.insert(id.clone(), bounds);
        Ok(())
    }

    /// Forget a node's box, e.g. when it scrolls out of the materialized set.
    pub fn forget(&mut self, id: &SkillId) -> Option<BoundingBox> {
        self.boxes.remove(id)
    }

    pub fn get(&self, id: &SkillId) -> Option<BoundingBox> {
        self.boxes.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }
}
