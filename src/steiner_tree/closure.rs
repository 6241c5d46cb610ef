//! Metric closure around the terminals, materialized as direct graph edges.

use crate::graph::{EdgeId, Graph, VertexId};
use crate::shortest_paths::{Radius, ShortestPathCache};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A way of adding shortest-path edges from terminals to the graph, so that stars can
/// span more than the direct neighbourhood of a vertex.
pub trait Closure {
    /// Build the first closure on the input graph.
    fn initialize(&mut self, graph: &mut Graph);

    /// Enlarge the closure after no star was found.
    /// Returns `false` if the closure cannot grow any further.
    fn widen(&mut self, graph: &mut Graph) -> bool;

    /// Start covering `terminal`, which a contraction just created.
    /// Its closure edges appear with the next widening.
    fn register_terminal(&mut self, terminal: VertexId);
}

/// Add an edge from the source of `cache` to every vertex it reached within `radius`.
/// Returns `true` if any edge was added or became lighter.
fn materialize(graph: &mut Graph, cache: &ShortestPathCache, radius: Radius) -> bool {
    let source = cache.source();
    let found = cache
        .reached(graph, radius)
        .map(|(v, d, provenance)| (v, d.finite_value(), provenance.to_vec()))
        .collect::<Vec<(VertexId, u64, Vec<EdgeId>)>>();
    let mut changed = false;
    for (v, distance, provenance) in found {
        changed |= graph.add_edge(source, v, distance, provenance);
    }
    changed
}

/// Closure whose radius starts small and doubles on demand.
///
/// Every terminal keeps its search paused at the current radius, so widening only
/// relaxes what lies between the old and the new radius.
#[derive(Clone, Debug)]
pub struct IncrementalClosure {
    caches: BTreeMap<VertexId, ShortestPathCache>,
    radius: Radius,
    threshold_cap: Option<u64>,
    cap: u64,
}

impl IncrementalClosure {
    pub fn new(initial_threshold: u64, threshold_cap: Option<u64>) -> Self {
        Self {
            caches: BTreeMap::new(),
            radius: Radius::Bounded(initial_threshold),
            threshold_cap,
            cap: threshold_cap.unwrap_or(u64::MAX),
        }
    }

    pub fn radius(&self) -> Radius {
        self.radius
    }

    /// Resume every live search at the current radius and materialize what it reached.
    fn extend(&mut self, graph: &mut Graph) -> bool {
        self.caches.retain(|&source, _| graph.contains_vertex(source));
        let mut changed = false;
        for cache in self.caches.values_mut() {
            cache.resume(graph, self.radius);
            changed |= materialize(graph, cache, self.radius);
        }
        changed
    }
}

impl Closure for IncrementalClosure {
    fn initialize(&mut self, graph: &mut Graph) {
        // no finite distance exceeds the total weight, so beyond it the radius is unbounded
        self.cap = self
            .threshold_cap
            .unwrap_or_else(|| graph.total_source_weight());
        self.caches = graph
            .terminals()
            .iter()
            .map(|&t| (t, ShortestPathCache::new(t)))
            .collect();
        self.extend(graph);
        debug!(radius = ?self.radius, cap = self.cap, "initialized incremental closure");
    }

    fn widen(&mut self, graph: &mut Graph) -> bool {
        let was_unbounded = self.radius == Radius::Unbounded;
        if let Radius::Bounded(threshold) = self.radius {
            let next = threshold.saturating_mul(2);
            self.radius = if next > self.cap {
                Radius::Unbounded
            } else {
                Radius::Bounded(next)
            };
        }
        let changed = self.extend(graph);
        debug!(radius = ?self.radius, changed, "widened closure");
        changed || !was_unbounded
    }

    fn register_terminal(&mut self, terminal: VertexId) {
        for cache in self.caches.values_mut() {
            cache.mark_unreachable(terminal);
        }
        self.caches.insert(terminal, ShortestPathCache::new(terminal));
    }
}

/// Closure computed once, completely, before the first contraction.
#[derive(Clone, Copy, Debug, Default)]
pub struct OneShotClosure;

impl Closure for OneShotClosure {
    fn initialize(&mut self, graph: &mut Graph) {
        let terminals = graph.terminals().iter().copied().collect::<Vec<_>>();
        let mut added = 0;
        for t in terminals {
            let mut cache = ShortestPathCache::new(t);
            cache.resume(graph, Radius::Unbounded);
            added += usize::from(materialize(graph, &cache, Radius::Unbounded));
        }
        debug!(sources_with_new_edges = added, "computed full metric closure");
    }

    fn widen(&mut self, _graph: &mut Graph) -> bool {
        false
    }

    fn register_terminal(&mut self, terminal: VertexId) {
        // contraction already moved every closure edge of the star onto the new terminal
        trace!(terminal, "new terminal needs no closure work");
    }
}
