use crate::graph::{EdgeId, Graph, VertexId};
use crate::steiner_tree::dreyfus_wagner::Solution;
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("edge {edge} closes a cycle")]
    Cycle { edge: EdgeId },
    #[error("terminal {terminal} is not covered")]
    MissingTerminal { terminal: VertexId },
    #[error("the tree falls apart into {components} components")]
    Disconnected { components: usize },
}

/// A Steiner tree over the vertices of the input graph, assembled from the edges a
/// kernel snapshot committed and the exact solution of that snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SteinerTree {
    // always ordered
    edges: BTreeSet<EdgeId>,
    weight: u64,
    approximate: Vec<EdgeId>,
    approximate_weight: u64,
    exact: Vec<EdgeId>,
    exact_weight: u64,
}

impl SteinerTree {
    /// Union the committed edges of `snapshot` with `exact`, keep a spanning forest of
    /// the union (lighter edges first) and strip leaves that are not terminals of
    /// `instance`.
    ///
    /// `instance` is the graph that was kernelized; `snapshot` one of its snapshots.
    pub fn assemble(instance: &Graph, snapshot: &Graph, exact: &Solution) -> Self {
        let approximate = snapshot.committed_edges();
        let mut candidates = approximate
            .iter()
            .chain(&exact.edges)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        candidates.sort_by_key(|&id| (instance.source_edge(id).weight, id));

        let mut sets = UnionFind::<VertexId>::new(instance.next_vertex_id());
        let mut edges = candidates
            .into_iter()
            .filter(|&id| {
                let (a, b) = instance.source_edge(id).endpoints;
                sets.union(a, b)
            })
            .collect::<BTreeSet<_>>();
        prune_steiner_leaves(instance, &mut edges);

        let weight = edges.iter().map(|&id| instance.source_edge(id).weight).sum();
        Self {
            edges,
            weight,
            approximate,
            approximate_weight: snapshot.committed_weight(),
            exact: exact.edges.clone(),
            exact_weight: exact.weight,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Input edge ids of the tree, ascending.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Edges the snapshot committed during kernelization.
    pub fn approximate_edges(&self) -> &[EdgeId] {
        &self.approximate
    }

    pub fn approximate_weight(&self) -> u64 {
        self.approximate_weight
    }

    /// Edges of the exact solution of the snapshot.
    pub fn exact_edges(&self) -> &[EdgeId] {
        &self.exact
    }

    pub fn exact_weight(&self) -> u64 {
        self.exact_weight
    }

    pub fn nodes(&self, instance: &Graph) -> BTreeSet<VertexId> {
        self.edges
            .iter()
            .flat_map(|&id| {
                let (a, b) = instance.source_edge(id).endpoints;
                [a, b]
            })
            .collect()
    }

    /// Check that the tree is acyclic, connected and covers every terminal of `instance`.
    pub fn validate(&self, instance: &Graph) -> Result<(), TreeError> {
        let mut sets = UnionFind::<VertexId>::new(instance.next_vertex_id());
        for &id in &self.edges {
            let (a, b) = instance.source_edge(id).endpoints;
            if !sets.union(a, b) {
                return Err(TreeError::Cycle { edge: id });
            }
        }
        let nodes = self.nodes(instance);
        if nodes.is_empty() {
            return match instance.terminals().iter().nth(1) {
                Some(&terminal) => Err(TreeError::MissingTerminal { terminal }),
                None => Ok(()),
            };
        }
        if let Some(&terminal) = instance.terminals().iter().find(|t| !nodes.contains(t)) {
            return Err(TreeError::MissingTerminal { terminal });
        }
        let components = nodes
            .iter()
            .map(|&v| sets.find(v))
            .collect::<BTreeSet<_>>()
            .len();
        if components > 1 {
            return Err(TreeError::Disconnected { components });
        }
        Ok(())
    }

    /// Write the tree in the PACE solution format, vertices 1-based.
    pub fn write<W: io::Write>(&self, out: &mut W, instance: &Graph) -> io::Result<()> {
        writeln!(out, "VALUE {}", self.weight)?;
        for &id in &self.edges {
            let (a, b) = instance.source_edge(id).endpoints;
            writeln!(out, "{} {}", a + 1, b + 1)?;
        }
        Ok(())
    }
}

/// Repeatedly drop edges whose endpoint is a non-terminal of degree 1.
fn prune_steiner_leaves(instance: &Graph, edges: &mut BTreeSet<EdgeId>) {
    let mut incident: BTreeMap<VertexId, BTreeSet<EdgeId>> = BTreeMap::new();
    for &id in edges.iter() {
        let (a, b) = instance.source_edge(id).endpoints;
        incident.entry(a).or_default().insert(id);
        incident.entry(b).or_default().insert(id);
    }
    let mut stack = incident.keys().copied().collect::<Vec<_>>();
    while let Some(v) = stack.pop() {
        if instance.is_terminal(v) {
            continue;
        }
        let Some(id) = incident
            .get(&v)
            .filter(|ids| ids.len() == 1)
            .and_then(|ids| ids.first().copied())
        else {
            continue;
        };
        let (a, b) = instance.source_edge(id).endpoints;
        let other = if a == v { b } else { a };
        edges.remove(&id);
        incident.remove(&v);
        if let Some(ids) = incident.get_mut(&other) {
            ids.remove(&id);
        }
        stack.push(other);
    }
}
