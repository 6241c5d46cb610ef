use crate::graph::{EdgeId, Graph, VertexId};
use crate::util::NaturalOrInfinite;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut, Range};
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortestPath {
    distance: NaturalOrInfinite,
    /// First hop (dense index) on a shortest path, `None` if unreachable.
    next: Option<usize>,
}

impl ShortestPath {
    pub fn distance(&self) -> NaturalOrInfinite {
        self.distance
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

impl Default for ShortestPath {
    fn default() -> Self {
        Self {
            distance: NaturalOrInfinite::infinity(),
            next: None,
        }
    }
}

/// All-pairs shortest paths over the vertices of a graph, addressed by dense indices
/// `0..dimension` assigned in ascending vertex id order.
pub struct ShortestPathMatrix {
    paths: Vec<ShortestPath>,
    dimension: usize,
    vertices: Vec<VertexId>,
    indices: BTreeMap<VertexId, usize>,
}

impl ShortestPathMatrix {
    pub fn new(graph: &Graph) -> Self {
        let vertices = graph.vertex_ids().collect::<Vec<_>>();
        let indices = vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect::<BTreeMap<_, _>>();
        let n = vertices.len();
        let mut res = ShortestPathMatrix {
            paths: vec![ShortestPath::default(); n * n],
            dimension: n,
            vertices,
            indices,
        };
        res.floyd_warshall(graph);
        res
    }

    /// Based on the pseudo-code
    /// [on Wikipedia](https://en.wikipedia.org/wiki/Floyd%E2%80%93Warshall_algorithm),
    /// with next-hop tracking for path reconstruction.
    fn floyd_warshall(&mut self, graph: &Graph) {
        for edge in graph.edges() {
            let (a, b) = edge.endpoints();
            let (from, to) = (self.index_of(a), self.index_of(b));
            let distance = NaturalOrInfinite::from(edge.weight());
            self[from][to] = ShortestPath {
                distance,
                next: Some(to),
            };
            self[to][from] = ShortestPath {
                distance,
                next: Some(from),
            };
        }
        for n in 0..self.dimension {
            self[n][n] = ShortestPath {
                distance: 0.into(),
                next: Some(n),
            };
        }
        for k in 0..self.dimension {
            for i in 0..self.dimension {
                let ik = self[i][k];
                if ik.distance.is_infinite() {
                    continue;
                }
                for j in 0..self.dimension {
                    let new_dist = ik.distance + self[k][j].distance;
                    if new_dist < self[i][j].distance {
                        self[i][j] = ShortestPath {
                            distance: new_dist,
                            next: ik.next,
                        };
                    }
                }
            }
        }
    }

    fn index_range(&self, index: usize) -> Range<usize> {
        let start = index * self.dimension;
        start..start + self.dimension
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Dense index of vertex `v`.
    ///
    /// # Panics
    /// If `v` was not a vertex of the graph the matrix was built from.
    pub fn index_of(&self, v: VertexId) -> usize {
        *self
            .indices
            .get(&v)
            .unwrap_or_else(|| panic!("vertex {} is not part of the distance matrix", v))
    }

    /// Vertex id of dense index `index`.
    pub fn vertex(&self, index: usize) -> VertexId {
        self.vertices[index]
    }

    pub fn distance(&self, from: usize, to: usize) -> NaturalOrInfinite {
        self[from][to].distance
    }

    /// Dense indices on a shortest path from `from` to `to`, both included.
    /// Empty if `to` is unreachable.
    pub fn path(&self, from: usize, to: usize) -> Vec<usize> {
        if self[from][to].next.is_none() {
            return vec![];
        }
        let mut path = vec![from];
        let mut current = from;
        while current != to {
            current = self[current][to]
                .next
                .expect("a reachable vertex has a next hop on every shortest path");
            path.push(current);
            assert!(path.len() <= self.dimension, "next-hop pointers form a cycle");
        }
        path
    }
}

/// This allows for neat two-dimensional indexing (e.g. `spa[a][b]`).
impl Index<usize> for ShortestPathMatrix {
    type Output = [ShortestPath];

    fn index(&self, index: usize) -> &Self::Output {
        &self.paths[self.index_range(index)]
    }
}

/// This allows for neat two-dimensional indexing (e.g. `spa[a][b] = c`).
impl IndexMut<usize> for ShortestPathMatrix {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let range = self.index_range(index);
        &mut self.paths[range]
    }
}

/// How far a single-source search may expand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Radius {
    /// Only distances strictly below the bound.
    Bounded(u64),
    Unbounded,
}

impl Radius {
    pub fn admits(self, distance: NaturalOrInfinite) -> bool {
        match self {
            Radius::Bounded(bound) => distance < NaturalOrInfinite::from(bound),
            Radius::Unbounded => distance.is_finite(),
        }
    }
}

/// Dijkstra state for one source that can be paused at a radius and resumed later
/// with a larger one without redoing earlier relaxations.
///
/// Besides distances it tracks, for every reached vertex, the input edge ids of the
/// best path found so far.
#[derive(Clone, Debug)]
pub struct ShortestPathCache {
    source: VertexId,
    distance: BTreeMap<VertexId, NaturalOrInfinite>,
    provenance: BTreeMap<VertexId, Vec<EdgeId>>,
    // decrease-key is remove + insert
    frontier: BTreeSet<(NaturalOrInfinite, VertexId)>,
}

impl ShortestPathCache {
    pub fn new(source: VertexId) -> Self {
        let zero = NaturalOrInfinite::from(0);
        Self {
            source,
            distance: BTreeMap::from([(source, zero)]),
            provenance: BTreeMap::from([(source, vec![])]),
            frontier: BTreeSet::from([(zero, source)]),
        }
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn distance(&self, v: VertexId) -> NaturalOrInfinite {
        self.distance
            .get(&v)
            .copied()
            .unwrap_or_else(NaturalOrInfinite::infinity)
    }

    /// Input edge ids of the best known path from the source to `v`.
    pub fn provenance(&self, v: VertexId) -> &[EdgeId] {
        self.provenance.get(&v).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register a vertex that did not exist when the search started.
    pub fn mark_unreachable(&mut self, v: VertexId) {
        if let Some(old) = self.distance.insert(v, NaturalOrInfinite::infinity()) {
            self.frontier.remove(&(old, v));
        }
        self.provenance.insert(v, vec![]);
    }

    /// No vertex is left to expand at any radius.
    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Continue the search, expanding every frontier vertex whose distance `radius`
    /// admits. Vertices that left the graph since they were reached are dropped.
    /// Returns the number of expanded vertices.
    pub fn resume(&mut self, graph: &Graph, radius: Radius) -> usize {
        let mut expanded = 0;
        while let Some(&(distance, u)) = self.frontier.first() {
            if !radius.admits(distance) {
                break;
            }
            self.frontier.pop_first();
            let Some(vertex) = graph.vertex(u) else {
                continue;
            };
            expanded += 1;
            let path_to_u = self.provenance(u).to_vec();
            for &v in vertex.neighbors() {
                let edge = graph.expect_edge(u, v);
                let candidate = distance + edge.weight();
                let current = self.distance(v);
                if candidate < current {
                    self.frontier.remove(&(current, v));
                    self.distance.insert(v, candidate);
                    let mut path = path_to_u.clone();
                    path.extend_from_slice(edge.provenance());
                    self.provenance.insert(v, path);
                    self.frontier.insert((candidate, v));
                }
            }
        }
        trace!(source = self.source, expanded, ?radius, "resumed shortest path search");
        expanded
    }

    /// Vertices other than the source that are present in `graph` and whose distance
    /// `radius` admits, with their distance and path provenance.
    pub fn reached<'a>(
        &'a self,
        graph: &'a Graph,
        radius: Radius,
    ) -> impl Iterator<Item = (VertexId, NaturalOrInfinite, &'a [EdgeId])> + 'a {
        self.distance
            .iter()
            .filter(move |&(&v, &d)| {
                v != self.source && radius.admits(d) && graph.contains_vertex(v)
            })
            .map(move |(&v, &d)| (v, d, self.provenance(v)))
    }
}
