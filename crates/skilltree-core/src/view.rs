//! Composition root for a live skill tree.
//!
//! `SkillTreeView` ties the merged graph, rank resolution, layout, geometry
//! and routing together behind the debounced recompute queue, and produces
//! a [`TreeFrame`] for the rendering surface.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use skilltree_types::config::SkillTreeConfig;
use skilltree_types::error::GeometryError;
use skilltree_types::event::{RecomputeSignal, TreeEvent};
use skilltree_types::layout::{BoundingBox, Lane, NodeLayout, RoutedEdge};
use skilltree_types::progress::UnlockState;
use skilltree_types::rank::RankLabel;
use skilltree_types::skill::SkillId;

use crate::event::EventBus;
use crate::graph::SkillGraph;
use crate::layout::{ConnectorRouter, DeferredEdge, LayoutEngine, TreeLayout};
use crate::progress::ProgressView;
use crate::rank::{RankResolver, RankTable};
use crate::scheduler::{RecomputeBatch, RecomputeScheduler};

/// Everything the rendering surface needs for one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeFrame {
    pub generation: u64,
    pub lanes: Vec<Lane>,
    pub layouts: Vec<NodeLayout>,
    pub edges: Vec<RoutedEdge>,
    pub deferred: Vec<DeferredEdge>,
    pub ranks: BTreeMap<SkillId, RankLabel>,
    pub states: BTreeMap<SkillId, UnlockState>,
}

#[derive(Debug)]
pub struct SkillTreeView {
    graph: Arc<SkillGraph>,
    resolver: RankResolver,
    ranks: RankTable,
    engine: LayoutEngine,
    router: ConnectorRouter,
    scheduler: RecomputeScheduler,
    events: EventBus,
    layout: TreeLayout,
}

impl SkillTreeView {
    pub fn new(graph: Arc<SkillGraph>, config: &SkillTreeConfig, events: EventBus) -> Self {
        let resolver = RankResolver::from_config(config);
        let ranks = resolver.resolve_all(&graph);
        let mut engine = LayoutEngine::from_config(config);
        engine.bind(&graph);
        let layout = engine.layout(&graph, &ranks);

        Self {
            graph,
            resolver,
            ranks,
            engine,
            router: ConnectorRouter::from_config(config),
            scheduler: RecomputeScheduler::from_config(config),
            events,
            layout,
        }
    }

    pub fn graph(&self) -> &Arc<SkillGraph> {
        &self.graph
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    pub fn resolver(&self) -> &RankResolver {
        &self.resolver
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn scheduler(&self) -> &RecomputeScheduler {
        &self.scheduler
    }

    /// Swap in a newly merged graph. Geometry of vanished nodes is dropped.
    pub fn set_graph(&mut self, graph: Arc<SkillGraph>, now: Instant) {
        self.engine.bind(&graph);
        self.graph = graph;
        self.scheduler.post(RecomputeSignal::GraphUpdated, now);
    }

    pub fn set_resolver(&mut self, resolver: RankResolver, now: Instant) {
        self.resolver = resolver;
        self.scheduler.post(RecomputeSignal::RanksChanged, now);
    }

    pub fn viewport_resized(&mut self, now: Instant) {
        self.scheduler.post(RecomputeSignal::ViewportResized, now);
    }

    pub fn progress_changed(&mut self, skill_id: SkillId, now: Instant) {
        self.scheduler
            .post(RecomputeSignal::ProgressChanged { skill_id }, now);
    }

    /// Record a measured box from the rendering surface.
    pub fn report_geometry(
        &mut self,
        id: &SkillId,
        bounds: BoundingBox,
        now: Instant,
    ) -> Result<(), GeometryError> {
        self.engine.report_geometry(id, bounds)?;
        self.scheduler.post(
            RecomputeSignal::GeometryMutated {
                node_id: id.clone(),
            },
            now,
        );
        Ok(())
    }

    /// A node left the materialized set; its connectors defer until it is
    /// measured again.
    pub fn forget_geometry(&mut self, id: &SkillId, now: Instant) {
        if self.engine.registry_mut().forget(id).is_some() {
            self.scheduler.post(
                RecomputeSignal::GeometryMutated {
                    node_id: id.clone(),
                },
                now,
            );
        }
    }

    /// Produce a frame if a debounced batch is due.
    pub fn poll(&mut self, now: Instant, activity: &ProgressView) -> Option<TreeFrame> {
        let batch = self.scheduler.poll(now)?;
        Some(self.recompute(batch, activity))
    }

    /// Produce a frame now, releasing anything pending.
    pub fn render(&mut self, activity: &ProgressView) -> TreeFrame {
        let batch = self.scheduler.flush().unwrap_or_else(|| RecomputeBatch {
            generation: self.scheduler.current_generation(),
            signals: Vec::new(),
            signal_count: 0,
        });
        self.recompute(batch, activity)
    }

    /// Whether `frame` is still the latest; publishes
    /// [`TreeEvent::RecomputeSuperseded`] when it is not.
    pub fn accept(&self, frame: &TreeFrame) -> bool {
        let current = self.scheduler.current_generation();
        if self.scheduler.is_current(frame.generation) {
            return true;
        }
        tracing::debug!(
            generation = frame.generation,
            current,
            "Discarding stale recompute result"
        );
        self.events.publish(TreeEvent::RecomputeSuperseded {
            generation: frame.generation,
            current,
        });
        false
    }

    fn recompute(&mut self, batch: RecomputeBatch, activity: &ProgressView) -> TreeFrame {
        if batch.affects_ordering() {
            self.ranks = self.resolver.resolve_all(&self.graph);
            self.layout = self.engine.layout(&self.graph, &self.ranks);
        } else {
            let registry = self.engine.registry();
            for node in &mut self.layout.nodes {
                node.bounds = registry.get(&node.node_id);
            }
        }

        let routes = self.router.route(&self.layout, &self.graph, activity);
        self.events.publish(TreeEvent::RecomputeCompleted {
            generation: batch.generation,
            signal_count: batch.signal_count,
            routed_edges: routes.edges.len(),
            deferred_edges: routes.deferred.len(),
        });

        TreeFrame {
            generation: batch.generation,
            lanes: self.layout.lanes.clone(),
            layouts: self.layout.nodes.clone(),
            edges: routes.edges,
            deferred: routes.deferred,
            ranks: self
                .ranks
                .iter()
                .map(|(id, label)| (id.clone(), label.clone()))
                .collect(),
            states: self
                .graph
                .nodes()
                .iter()
                .map(|n| (n.id.clone(), activity.state_of(&n.id)))
                .collect(),
        }
    }
}
