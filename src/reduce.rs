//! Reductions that never change the weight of an optimal Steiner tree.

use crate::error::{SteinerError, SteinerResult};
use crate::graph::{Graph, VertexId};
use tracing::{debug, info};

/// Steiner vertices removed by [`reduce`], in removal order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reduction {
    pub isolated: Vec<VertexId>,
    pub leaves: Vec<VertexId>,
    /// Degree-2 vertices replaced by a direct edge between their neighbours.
    pub subdivisions: Vec<VertexId>,
}

impl Reduction {
    pub fn removed(&self) -> usize {
        self.isolated.len() + self.leaves.len() + self.subdivisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed() == 0
    }
}

/// Remove isolated Steiner vertices, then Steiner leaves, then bypass degree-2 Steiner
/// vertices, and repeat until nothing changes.
///
/// Terminals are never removed. An isolated terminal makes the instance infeasible
/// unless it is the only terminal.
pub fn reduce(graph: &mut Graph) -> SteinerResult<Reduction> {
    let mut reduction = Reduction::default();
    loop {
        let before = reduction.removed();
        remove_isolated(graph, &mut reduction)?;
        remove_leaves(graph, &mut reduction);
        undo_subdivisions(graph, &mut reduction);
        debug!(removed = reduction.removed() - before, "reduction round");
        if reduction.removed() == before {
            break;
        }
    }
    info!(
        isolated = reduction.isolated.len(),
        leaves = reduction.leaves.len(),
        subdivisions = reduction.subdivisions.len(),
        vertices = graph.num_vertices(),
        edges = graph.num_edges(),
        "reduced graph"
    );
    Ok(reduction)
}

fn remove_isolated(graph: &mut Graph, reduction: &mut Reduction) -> SteinerResult<()> {
    let isolated = graph
        .vertices()
        .filter(|(_, v)| v.degree() == 0)
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    for v in isolated {
        if graph.is_terminal(v) {
            if graph.num_terminals() > 1 {
                return Err(SteinerError::IsolatedTerminal { terminal: v });
            }
            continue;
        }
        graph.remove_vertex(v);
        reduction.isolated.push(v);
    }
    Ok(())
}

/// Removing a leaf may turn its neighbour into a leaf, so neighbours go back on the stack.
fn remove_leaves(graph: &mut Graph, reduction: &mut Reduction) {
    let mut stack = graph.vertex_ids().collect::<Vec<_>>();
    while let Some(leaf) = stack.pop() {
        if graph.degree(leaf) != 1 || graph.is_terminal(leaf) {
            continue;
        }
        let neighbor = graph
            .neighbors(leaf)
            .next()
            .expect("a vertex of degree 1 has a neighbour");
        graph.remove_vertex(leaf);
        reduction.leaves.push(leaf);
        stack.push(neighbor);
    }
}

/// A Steiner vertex of degree 2 is a subdivision of a single edge between its
/// neighbours; replace it by that edge, concatenating the provenance.
fn undo_subdivisions(graph: &mut Graph, reduction: &mut Reduction) {
    let mut stack = graph.vertex_ids().collect::<Vec<_>>();
    while let Some(middle) = stack.pop() {
        if graph.degree(middle) != 2 || graph.is_terminal(middle) {
            continue;
        }
        let (one, two) = {
            let mut neighbors = graph.neighbors(middle);
            match (neighbors.next(), neighbors.next()) {
                (Some(one), Some(two)) => (one, two),
                _ => unreachable!("a vertex of degree 2 has two neighbours"),
            }
        };
        let edge_one = graph.expect_edge(middle, one);
        let edge_two = graph.expect_edge(middle, two);
        let weight = edge_one.weight().saturating_add(edge_two.weight());
        let mut provenance = edge_one.provenance().to_vec();
        provenance.extend_from_slice(edge_two.provenance());
        graph.add_edge(one, two, weight, provenance);
        graph.remove_vertex(middle);
        reduction.subdivisions.push(middle);
        stack.push(one);
        stack.push(two);
    }
}
