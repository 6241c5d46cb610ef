//! Lossy kernelization by repeated star contraction.
//!
//! Each step picks the terminal star with the smallest average cost per merged terminal,
//! commits its input edges to the solution and replaces all vertices it spans by a single
//! new terminal. The graph is snapshotted after every step, so a caller can trade
//! instance size for solution quality by picking a snapshot to solve exactly.

use crate::config::{ClosureStrategy, KernelConfig};
use crate::error::SteinerResult;
use crate::graph::{EdgeId, EdgeKey, Graph, VertexId};
use crate::steiner_tree::closure::{Closure, IncrementalClosure, OneShotClosure};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Average weight per merged terminal, compared exactly.
#[derive(Clone, Copy, Debug)]
pub struct Ratio {
    weight: u64,
    terminals: u64,
}

impl Ratio {
    /// # Panics
    /// If `terminals` is zero.
    pub fn new(weight: u64, terminals: u64) -> Self {
        assert!(terminals > 0, "a ratio needs at least one terminal");
        Self { weight, terminals }
    }

    pub fn value(self) -> f64 {
        self.weight as f64 / self.terminals as f64
    }
}

impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ratio {}

impl PartialOrd for Ratio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ratio {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.weight) * u128::from(other.terminals);
        let rhs = u128::from(other.weight) * u128::from(self.terminals);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} = {:.3}", self.weight, self.terminals, self.value())
    }
}

/// A vertex together with its cheapest edges to terminals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Star {
    pub center: VertexId,
    pub ratio: Ratio,
    pub edges: Vec<EdgeKey>,
}

impl Star {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether `self` should be contracted before `other`.
    fn beats(&self, other: &Star) -> bool {
        self.ratio < other.ratio || (self.ratio == other.ratio && self.len() > other.len())
    }
}

/// The best star centred at `center`: among all prefixes of its terminal edges (in the
/// order of [`Graph::terminal_edges`]), the one with the smallest ratio, preferring the
/// longer prefix on ties. A prefix has ratio `weight / (k + z)` where `k` is its length
/// and `z` is 1 for a terminal center, and must merge at least two terminals.
pub fn best_star(graph: &Graph, center: VertexId) -> Option<Star> {
    let z = u64::from(graph.is_terminal(center));
    let edges = graph.terminal_edges(center);
    let mut weight: u64 = 0;
    let mut best: Option<(Ratio, usize)> = None;
    for (i, edge) in edges.iter().enumerate() {
        weight = weight.saturating_add(edge.weight());
        let k = i as u64 + 1;
        if k + z < 2 {
            continue;
        }
        let ratio = Ratio::new(weight, k + z);
        if best.map_or(true, |(best_ratio, _)| ratio <= best_ratio) {
            best = Some((ratio, i + 1));
        }
    }
    best.map(|(ratio, len)| Star {
        center,
        ratio,
        edges: edges[..len].iter().map(|e| e.endpoints()).collect(),
    })
}

/// One contraction step, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contraction {
    /// 1-based step number, equal to the index of the snapshot taken after it.
    pub step: usize,
    pub center: VertexId,
    pub ratio: Ratio,
    pub star_edges: Vec<EdgeKey>,
    /// Input edges committed by this step.
    pub committed: Vec<EdgeId>,
    /// Every vertex replaced by the new terminal.
    pub absorbed: Vec<VertexId>,
    pub terminal: VertexId,
}

impl fmt::Display for Contraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "contraction {}: center {}, ratio {}",
            self.step, self.center, self.ratio
        )?;
        write!(f, "  star edges:")?;
        for (a, b) in &self.star_edges {
            write!(f, " ({}, {})", a, b)?;
        }
        writeln!(f)?;
        write!(f, "  committed:")?;
        for id in &self.committed {
            write!(f, " {}", id)?;
        }
        writeln!(f)?;
        write!(f, "  absorbed:")?;
        for v in &self.absorbed {
            write!(f, " {}", v)?;
        }
        writeln!(f, " -> {}", self.terminal)
    }
}

/// Result of [`kernelize`].
#[derive(Clone, Debug)]
pub struct Kernelization {
    snapshots: Vec<Graph>,
    contractions: Vec<Contraction>,
}

impl Kernelization {
    /// Snapshot 0 is the input, snapshot `i` the graph after the `i`-th contraction.
    pub fn snapshots(&self) -> &[Graph] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Graph> {
        self.snapshots
    }

    pub fn contractions(&self) -> &[Contraction] {
        &self.contractions
    }

    /// The human readable trace of all contractions.
    pub fn trace(&self) -> String {
        self.contractions.iter().map(ToString::to_string).collect()
    }
}

/// Contract stars until a single terminal is left, snapshotting after every step.
///
/// Stops early, with a warning, if the terminals turn out to be disconnected.
pub fn kernelize(graph: &Graph, config: &KernelConfig) -> SteinerResult<Kernelization> {
    config.validate()?;
    let closure: Box<dyn Closure> = match config.strategy {
        ClosureStrategy::Incremental => Box::new(IncrementalClosure::new(
            config.initial_threshold,
            config.threshold_cap,
        )),
        ClosureStrategy::OneShot => Box::new(OneShotClosure),
    };
    let kernelization = Kernel::new(graph.clone(), closure).run();
    let last = kernelization
        .snapshots
        .last()
        .expect("the input is always the first snapshot");
    info!(
        strategy = %config.strategy,
        contractions = kernelization.contractions.len(),
        terminals = last.num_terminals(),
        committed_weight = last.committed_weight(),
        "kernelized"
    );
    Ok(kernelization)
}

struct Kernel {
    graph: Graph,
    closure: Box<dyn Closure>,
    stars: BTreeMap<VertexId, Star>,
    snapshots: Vec<Graph>,
    contractions: Vec<Contraction>,
}

impl Kernel {
    fn new(graph: Graph, closure: Box<dyn Closure>) -> Self {
        Self {
            graph,
            closure,
            stars: BTreeMap::new(),
            snapshots: vec![],
            contractions: vec![],
        }
    }

    fn run(mut self) -> Kernelization {
        self.snapshots.push(self.graph.clone());
        self.closure.initialize(&mut self.graph);
        self.recompute_all_stars();
        while self.graph.num_terminals() > 1 {
            match self.best_star() {
                Some(star) => {
                    let terminal = self.contract(star);
                    self.closure.register_terminal(terminal);
                    self.recompute_around(terminal);
                    self.snapshots.push(self.graph.clone());
                }
                None => {
                    if !self.closure.widen(&mut self.graph) {
                        warn!(
                            terminals = self.graph.num_terminals(),
                            "no star left to contract, the terminals are disconnected"
                        );
                        break;
                    }
                    self.recompute_all_stars();
                }
            }
        }
        Kernelization {
            snapshots: self.snapshots,
            contractions: self.contractions,
        }
    }

    fn recompute_all_stars(&mut self) {
        self.stars = self
            .graph
            .vertex_ids()
            .filter_map(|v| best_star(&self.graph, v).map(|star| (v, star)))
            .collect();
    }

    /// Only `v` and its neighbours can have changed terminal edges.
    fn recompute_around(&mut self, v: VertexId) {
        let affected = std::iter::once(v)
            .chain(self.graph.neighbors(v))
            .collect::<Vec<_>>();
        for u in affected {
            match best_star(&self.graph, u) {
                Some(star) => self.stars.insert(u, star),
                None => self.stars.remove(&u),
            };
        }
    }

    /// Smallest ratio, then most edges, then smallest center id.
    fn best_star(&self) -> Option<Star> {
        let mut best: Option<&Star> = None;
        for star in self.stars.values() {
            if best.map_or(true, |b| star.beats(b)) {
                best = Some(star);
            }
        }
        best.cloned()
    }

    /// Replace every vertex spanned by `star` with a new terminal and return it.
    fn contract(&mut self, star: Star) -> VertexId {
        let terminal = self.graph.add_vertex();
        self.graph.set_terminal(terminal);
        let committed = star
            .edges
            .iter()
            .flat_map(|&(a, b)| self.graph.expect_edge(a, b).provenance().to_vec())
            .collect::<BTreeSet<_>>();
        let mut spanned = star
            .edges
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<BTreeSet<_>>();
        for &id in &committed {
            let (a, b) = self.graph.current_endpoints(id);
            spanned.extend([a, b].into_iter().filter(|&v| self.graph.contains_vertex(v)));
        }
        spanned.remove(&terminal);
        self.graph.commit(committed.iter().copied());

        for &v in &spanned {
            let outside = self
                .graph
                .neighbors(v)
                .filter(|n| !spanned.contains(n))
                .collect::<Vec<_>>();
            for n in outside {
                let edge = self
                    .graph
                    .remove_edge(v, n)
                    .expect("neighbours share an edge");
                self.graph
                    .add_edge(terminal, n, edge.weight(), edge.provenance().to_vec());
            }
        }
        for &v in &spanned {
            self.graph.absorb(v, terminal);
            self.graph.remove_vertex(v);
            self.stars.remove(&v);
        }

        let contraction = Contraction {
            step: self.contractions.len() + 1,
            center: star.center,
            ratio: star.ratio,
            star_edges: star.edges,
            committed: committed.into_iter().collect(),
            absorbed: spanned.into_iter().collect(),
            terminal,
        };
        debug!(
            step = contraction.step,
            center = contraction.center,
            ratio = contraction.ratio.value(),
            absorbed = contraction.absorbed.len(),
            terminals = self.graph.num_terminals(),
            "contracted star"
        );
        self.contractions.push(contraction);
        terminal
    }
}
