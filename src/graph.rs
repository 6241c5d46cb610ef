use std::collections::{BTreeMap, BTreeSet};

pub type VertexId = usize;
pub type EdgeId = usize;
pub type EdgeWeight = u64;
/// Unordered vertex pair, stored as `(smaller, larger)`.
pub type EdgeKey = (VertexId, VertexId);

/// Canonical key of the unordered pair `{a, b}`.
pub fn edge_key(a: VertexId, b: VertexId) -> EdgeKey {
    (a.min(b), a.max(b))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vertex {
    terminal: bool,
    neighbors: BTreeSet<VertexId>,
    // always a subset of `neighbors`
    terminal_neighbors: BTreeSet<VertexId>,
}

impl Vertex {
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn neighbors(&self) -> &BTreeSet<VertexId> {
        &self.neighbors
    }

    pub fn terminal_neighbors(&self) -> &BTreeSet<VertexId> {
        &self.terminal_neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// A current edge of the graph.
///
/// Besides its weight, an edge remembers the ids of the input edges it stands for
/// (its provenance): a single id for an input edge, the concatenated ids of a path
/// for a bypassed subdivision or a metric-closure edge.
#[derive(Clone, Debug, Eq)]
pub struct Edge {
    endpoints: EdgeKey,
    weight: EdgeWeight,
    provenance: Vec<EdgeId>,
}

impl Edge {
    pub fn endpoints(&self) -> EdgeKey {
        self.endpoints
    }

    pub fn weight(&self) -> EdgeWeight {
        self.weight
    }

    pub fn provenance(&self) -> &[EdgeId] {
        &self.provenance
    }

    /// The endpoint that is not `v`.
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.endpoints.0 == v {
            self.endpoints.1
        } else {
            self.endpoints.0
        }
    }
}

/// Edges are equal if they join the same vertices with the same weight.
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.endpoints == other.endpoints && self.weight == other.weight
    }
}

/// An edge as it was defined in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceEdge {
    pub endpoints: EdgeKey,
    pub weight: EdgeWeight,
}

/// Mutable Steiner graph: at most one edge per unordered vertex pair, a terminal
/// set, the provenance of every edge and the input edges committed to the solution
/// so far.
///
/// Cloning produces a fully independent copy, which is what kernel snapshots are.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeKey, Edge>,
    sources: Vec<SourceEdge>,
    absorbed_into: BTreeMap<VertexId, VertexId>,
    terminals: BTreeSet<VertexId>,
    committed: BTreeSet<EdgeId>,
    next_vertex: VertexId,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph with the isolated vertices `0..num_vertices`.
    pub fn with_vertices(num_vertices: usize) -> Self {
        let mut graph = Self::new();
        for _ in 0..num_vertices {
            graph.add_vertex();
        }
        graph
    }

    /// Create a new isolated non-terminal vertex with the next unused id.
    pub fn add_vertex(&mut self) -> VertexId {
        let id = self.next_vertex;
        self.vertices.insert(id, Vertex::default());
        self.next_vertex += 1;
        id
    }

    fn ensure_vertex(&mut self, v: VertexId) {
        self.vertices.entry(v).or_default();
        self.next_vertex = self.next_vertex.max(v + 1);
    }

    fn vertex_mut(&mut self, v: VertexId) -> &mut Vertex {
        self.vertices
            .get_mut(&v)
            .unwrap_or_else(|| panic!("vertex {} is not in the graph", v))
    }

    /// Define an input edge and return its id. Missing endpoints are created.
    ///
    /// Only meant for building the initial graph: the caller guarantees `u != v`
    /// and that `{u, v}` has no edge yet.
    pub fn define_edge(&mut self, u: VertexId, v: VertexId, weight: EdgeWeight) -> EdgeId {
        debug_assert_ne!(u, v, "input edges must not be loops");
        debug_assert!(
            !self.edges.contains_key(&edge_key(u, v)),
            "input edges must not be parallel"
        );
        self.ensure_vertex(u);
        self.ensure_vertex(v);
        let id = self.sources.len();
        let key = edge_key(u, v);
        self.sources.push(SourceEdge {
            endpoints: key,
            weight,
        });
        self.edges.insert(
            key,
            Edge {
                endpoints: key,
                weight,
                provenance: vec![id],
            },
        );
        self.link(u, v);
        id
    }

    /// Add an edge between existing vertices, keeping the lighter edge if `{u, v}`
    /// already has one. Loops are ignored. Returns `true` if the graph changed.
    pub fn add_edge(
        &mut self,
        u: VertexId,
        v: VertexId,
        weight: EdgeWeight,
        provenance: Vec<EdgeId>,
    ) -> bool {
        if u == v {
            return false;
        }
        let key = edge_key(u, v);
        if let Some(existing) = self.edges.get_mut(&key) {
            if weight < existing.weight {
                existing.weight = weight;
                existing.provenance = provenance;
                return true;
            }
            return false;
        }
        self.edges.insert(
            key,
            Edge {
                endpoints: key,
                weight,
                provenance,
            },
        );
        self.link(u, v);
        true
    }

    fn link(&mut self, u: VertexId, v: VertexId) {
        let u_terminal = self.is_terminal(u);
        let v_terminal = self.is_terminal(v);
        let vertex_u = self.vertex_mut(u);
        vertex_u.neighbors.insert(v);
        if v_terminal {
            vertex_u.terminal_neighbors.insert(v);
        }
        let vertex_v = self.vertex_mut(v);
        vertex_v.neighbors.insert(u);
        if u_terminal {
            vertex_v.terminal_neighbors.insert(u);
        }
    }

    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> Option<Edge> {
        let edge = self.edges.remove(&edge_key(u, v))?;
        for (a, b) in [(u, v), (v, u)] {
            if let Some(vertex) = self.vertices.get_mut(&a) {
                vertex.neighbors.remove(&b);
                vertex.terminal_neighbors.remove(&b);
            }
        }
        Some(edge)
    }

    /// Remove `v` together with all its edges. A removed terminal leaves the terminal set.
    pub fn remove_vertex(&mut self, v: VertexId) -> Option<Vertex> {
        let neighbors = self.vertices.get(&v)?.neighbors.clone();
        for n in neighbors {
            self.remove_edge(v, n);
        }
        self.terminals.remove(&v);
        self.vertices.remove(&v)
    }

    pub fn set_terminal(&mut self, t: VertexId) {
        let vertex = self.vertex_mut(t);
        vertex.terminal = true;
        let neighbors = vertex.neighbors.clone();
        for n in neighbors {
            self.vertex_mut(n).terminal_neighbors.insert(t);
        }
        self.terminals.insert(t);
    }

    pub fn unset_terminal(&mut self, t: VertexId) {
        if !self.is_terminal(t) {
            return;
        }
        let vertex = self.vertex_mut(t);
        vertex.terminal = false;
        let neighbors = vertex.neighbors.clone();
        for n in neighbors {
            self.vertex_mut(n).terminal_neighbors.remove(&t);
        }
        self.terminals.remove(&t);
    }

    /// Edges from `v` to its terminal neighbours, sorted by weight and then by the
    /// smallest provenance id. Kernelization relies on this order for its tie-breaks.
    pub fn terminal_edges(&self, v: VertexId) -> Vec<&Edge> {
        let Some(vertex) = self.vertices.get(&v) else {
            return vec![];
        };
        let mut edges = vertex
            .terminal_neighbors
            .iter()
            .map(|&t| self.expect_edge(v, t))
            .collect::<Vec<_>>();
        edges.sort_by_key(|e| (e.weight, e.provenance.iter().min().copied()));
        edges
    }

    pub fn vertex(&self, v: VertexId) -> Option<&Vertex> {
        self.vertices.get(&v)
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains_key(&v)
    }

    /// Vertex ids in ascending order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices.iter().map(|(&id, v)| (id, v))
    }

    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .get(&v)
            .into_iter()
            .flat_map(|vertex| vertex.neighbors.iter().copied())
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.vertices.get(&v).map_or(0, Vertex::degree)
    }

    pub fn is_terminal(&self, v: VertexId) -> bool {
        self.vertices.get(&v).map_or(false, |vertex| vertex.terminal)
    }

    pub fn edge(&self, u: VertexId, v: VertexId) -> Option<&Edge> {
        self.edges.get(&edge_key(u, v))
    }

    /// Like [`Graph::edge`] for pairs that are known to be adjacent.
    ///
    /// # Panics
    /// If there is no edge `{u, v}`.
    pub fn expect_edge(&self, u: VertexId, v: VertexId) -> &Edge {
        self.edge(u, v)
            .unwrap_or_else(|| panic!("neighbours {} and {} have no edge", u, v))
    }

    /// Current edges ordered by their endpoint pair.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn terminals(&self) -> &BTreeSet<VertexId> {
        &self.terminals
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_steiner_vertices(&self) -> usize {
        self.vertices.len() - self.terminals.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The id the next minted vertex will get.
    pub fn next_vertex_id(&self) -> VertexId {
        self.next_vertex
    }

    /// The input edge with id `id`, with its input endpoints.
    pub fn source_edge(&self, id: EdgeId) -> SourceEdge {
        self.sources[id]
    }

    pub fn num_source_edges(&self) -> usize {
        self.sources.len()
    }

    /// Sum of all input edge weights; no path in the graph can be longer.
    pub fn total_source_weight(&self) -> u64 {
        self.sources
            .iter()
            .fold(0, |sum: u64, e| sum.saturating_add(e.weight))
    }

    /// Sum of the input weights of the given edge ids.
    pub fn provenance_weight(&self, ids: &[EdgeId]) -> u64 {
        ids.iter()
            .fold(0, |sum: u64, &id| sum.saturating_add(self.sources[id].weight))
    }

    /// Record that `v` was contracted into `into`.
    pub fn absorb(&mut self, v: VertexId, into: VertexId) {
        debug_assert_ne!(v, into);
        self.absorbed_into.insert(v, into);
    }

    /// The vertex that currently stands for `v`: `v` itself unless it was contracted,
    /// otherwise the (transitively) absorbing vertex.
    pub fn representative(&self, mut v: VertexId) -> VertexId {
        while let Some(&into) = self.absorbed_into.get(&v) {
            v = into;
        }
        v
    }

    /// Endpoints of input edge `id` after following all contractions.
    pub fn current_endpoints(&self, id: EdgeId) -> EdgeKey {
        let (a, b) = self.sources[id].endpoints;
        edge_key(self.representative(a), self.representative(b))
    }

    /// Permanently add input edges to the solution.
    pub fn commit(&mut self, ids: impl IntoIterator<Item = EdgeId>) {
        self.committed.extend(ids);
    }

    /// Input edges committed to the solution, ascending.
    pub fn committed_edges(&self) -> Vec<EdgeId> {
        self.committed.iter().copied().collect()
    }

    pub fn committed_weight(&self) -> u64 {
        self.provenance_weight(&self.committed_edges())
    }
}
