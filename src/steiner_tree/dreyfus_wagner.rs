use crate::error::{SteinerError, SteinerResult};
use crate::graph::{EdgeId, Graph};
use crate::shortest_paths::ShortestPathMatrix;
use crate::util::{proper_subsets, subsets_by_size, NaturalOrInfinite};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// An optimal Steiner tree of a graph, as input edge ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    pub weight: u64,
    /// Ascending and free of duplicates.
    pub edges: Vec<EdgeId>,
}

/// Minimal weight of a tree connecting the terminals of a row's subset and the vertex
/// of a column, and how it was obtained.
#[derive(Clone, Copy, Debug)]
struct Cell {
    weight: NaturalOrInfinite,
    /// `(first, second, pivot)`: the subsets of two subtrees meeting at column `pivot`,
    /// which is joined to this cell's column by a shortest path.
    /// `None` for the single-terminal rows.
    split: Option<(usize, usize, usize)>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            weight: NaturalOrInfinite::infinity(),
            split: None,
        }
    }
}

/// Dynamic programming table with one row per non-empty terminal subset (as a bitmask)
/// and one column per Steiner vertex.
struct Table {
    cells: Vec<Cell>,
    columns: usize,
}

impl Table {
    /// Fails if the table for `terminals` terminals cannot be addressed or allocated.
    fn new(terminals: usize, columns: usize) -> SteinerResult<Self> {
        let too_many = || SteinerError::TooManyTerminals {
            terminals,
            limit: terminal_limit(columns),
        };
        if terminals > terminal_limit(columns) {
            return Err(too_many());
        }
        let len = 1usize
            .checked_shl(terminals as u32)
            .and_then(|rows| rows.checked_mul(columns))
            .ok_or_else(too_many)?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|_| too_many())?;
        cells.resize(len, Cell::default());
        Ok(Self { cells, columns })
    }

    fn get(&self, subset: usize, column: usize) -> Cell {
        self.cells[subset * self.columns + column]
    }

    fn set(&mut self, subset: usize, column: usize, cell: Cell) {
        self.cells[subset * self.columns + column] = cell;
    }
}

/// Largest number of terminals whose table with `columns` columns fits in the address space.
fn terminal_limit(columns: usize) -> usize {
    let rows = isize::MAX as usize / std::mem::size_of::<Cell>() / columns.max(1);
    rows.checked_ilog2().map_or(0, |bits| bits as usize)
}

/// Dreyfus-Wagner algorithm for finding a minimal Steiner tree.
///
/// Runs in `O(3^t * n + 2^t * n^2 + n^3)` for `t` terminals and `n` vertices, so the
/// caller is responsible for keeping `t` small.
pub fn dreyfus_wagner(graph: &Graph) -> SteinerResult<Solution> {
    if graph.num_terminals() <= 1 {
        return Ok(Solution::default());
    }
    let graph = with_leaf_terminals(graph);
    let terminals = graph.terminals().iter().copied().collect::<Vec<_>>();
    let columns = graph
        .vertex_ids()
        .filter(|&v| !graph.is_terminal(v))
        .collect::<Vec<_>>();
    info!(
        terminals = terminals.len(),
        columns = columns.len(),
        "solving exactly"
    );
    let shortest_paths = ShortestPathMatrix::new(&graph);
    let terminal_index = terminals
        .iter()
        .map(|&t| shortest_paths.index_of(t))
        .collect::<Vec<_>>();
    let column_index = columns
        .iter()
        .map(|&v| shortest_paths.index_of(v))
        .collect::<Vec<_>>();
    let distance = |a: usize, b: usize| shortest_paths.distance(a, b);

    let mut table = Table::new(terminals.len(), columns.len())?;
    for (i, &t) in terminal_index.iter().enumerate() {
        for (c, &v) in column_index.iter().enumerate() {
            table.set(
                1 << i,
                c,
                Cell {
                    weight: distance(t, v),
                    split: None,
                },
            );
        }
    }
    for subset in subsets_by_size(terminals.len()) {
        if subset.count_ones() < 2 {
            continue;
        }
        // best way to split `subset` into two subtrees meeting at each column
        let lowest = subset & subset.wrapping_neg();
        let hubs = (0..columns.len())
            .map(|u| {
                proper_subsets(subset)
                    .filter(|first| first & lowest != 0)
                    .map(|first| {
                        let second = subset ^ first;
                        (
                            table.get(first, u).weight + table.get(second, u).weight,
                            first,
                            second,
                        )
                    })
                    .min()
                    .expect("a subset of two or more terminals has a proper split")
            })
            .collect::<Vec<_>>();
        for (v, &v_index) in column_index.iter().enumerate() {
            let mut best = Cell::default();
            for (u, &(weight, first, second)) in hubs.iter().enumerate() {
                let candidate = weight + distance(v_index, column_index[u]);
                if candidate < best.weight {
                    best = Cell {
                        weight: candidate,
                        split: Some((first, second, u)),
                    };
                }
            }
            table.set(subset, v, best);
        }
    }

    let full = (1 << terminals.len()) - 1;
    let (weight, root) = (0..columns.len())
        .map(|v| (table.get(full, v).weight, v))
        .min()
        .expect("leaf terminals always have a Steiner neighbour");
    let Some(weight) = weight.finite() else {
        return Err(SteinerError::Disconnected);
    };

    let mut edges = BTreeSet::new();
    let mut path_edges = |from: usize, to: usize| {
        for hop in shortest_paths.path(from, to).windows(2) {
            let (a, b) = (shortest_paths.vertex(hop[0]), shortest_paths.vertex(hop[1]));
            let edge = graph.expect_edge(a, b);
            edges.extend(edge.provenance().iter().copied());
        }
    };
    let mut stack = vec![(full, root)];
    while let Some((subset, column)) = stack.pop() {
        match table.get(subset, column).split {
            None => {
                debug_assert_eq!(subset.count_ones(), 1);
                let t = subset.trailing_zeros() as usize;
                path_edges(terminal_index[t], column_index[column]);
            }
            Some((first, second, pivot)) => {
                path_edges(column_index[column], column_index[pivot]);
                stack.push((first, pivot));
                stack.push((second, pivot));
            }
        }
    }
    let edges = edges.into_iter().collect::<Vec<_>>();
    debug!(weight, edges = edges.len(), "reconstructed exact solution");
    Ok(Solution { weight, edges })
}

/// Copy of `graph` in which every terminal is a leaf with a Steiner neighbour.
///
/// A terminal that is not such a leaf becomes a Steiner vertex and gets a new terminal
/// attached by a weight 0 edge that stands for no input edge.
fn with_leaf_terminals(graph: &Graph) -> Graph {
    let mut graph = graph.clone();
    let terminals = graph.terminals().iter().copied().collect::<Vec<_>>();
    for t in terminals {
        let is_leaf = {
            let mut neighbors = graph.neighbors(t);
            match (neighbors.next(), neighbors.next()) {
                (Some(n), None) => !graph.is_terminal(n),
                _ => false,
            }
        };
        if is_leaf {
            continue;
        }
        graph.unset_terminal(t);
        let pendant = graph.add_vertex();
        graph.set_terminal(pendant);
        graph.add_edge(t, pendant, 0, vec![]);
    }
    graph
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::tests::spoke_wheel;
    use crate::parse::tests::{
        shortcut_test_graph, small_test_graph, steiner_example_paper, steiner_example_wiki,
    };
    use crate::util::TestResult;
    use petgraph::unionfind::UnionFind;

    /// Minimal weight over all sets of Steiner vertices of a minimum spanning tree
    /// of the terminals plus that set.
    pub(crate) fn brute_force_weight(graph: &Graph) -> Option<u64> {
        let terminals = graph.terminals().clone();
        let steiner = graph
            .vertex_ids()
            .filter(|v| !terminals.contains(v))
            .collect::<Vec<_>>();
        if terminals.len() <= 1 {
            return Some(0);
        }
        let mut edges = graph
            .edges()
            .map(|e| (e.weight(), e.endpoints()))
            .collect::<Vec<_>>();
        edges.sort_unstable();
        let mut best = None;
        for chosen in 0..1usize << steiner.len() {
            let mut vertices = terminals.clone();
            vertices.extend(
                (0..steiner.len())
                    .filter(|i| chosen & (1 << i) != 0)
                    .map(|i| steiner[i]),
            );
            let mut sets = UnionFind::<usize>::new(graph.next_vertex_id());
            let mut weight = 0;
            let mut joined = 1;
            for &(w, (a, b)) in &edges {
                if vertices.contains(&a) && vertices.contains(&b) && sets.union(a, b) {
                    weight += w;
                    joined += 1;
                }
            }
            if joined == vertices.len() && best.map_or(true, |b| weight < b) {
                best = Some(weight);
            }
        }
        best
    }

    fn assert_solution_is_consistent(graph: &Graph, solution: &Solution) {
        assert!(solution.edges.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(graph.provenance_weight(&solution.edges), solution.weight);
    }

    #[test]
    fn test_dreyfus_wagner_trivial() -> TestResult {
        let trivial = small_test_graph()?;
        let solution = dreyfus_wagner(&trivial)?;
        assert_eq!(solution.weight, 3);
        // the direct edge and the detour through 1 weigh the same
        assert!(solution.edges == vec![2] || solution.edges == vec![0, 1]);
        assert_solution_is_consistent(&trivial, &solution);
        Ok(())
    }

    #[test]
    fn test_dreyfus_wagner_shortcut() -> TestResult {
        let graph = shortcut_test_graph()?;
        let solution = dreyfus_wagner(&graph)?;
        assert_eq!(solution.weight, 2);
        assert_eq!(solution.edges, vec![0, 2]);
        Ok(())
    }

    #[test]
    fn test_dreyfus_wagner() -> TestResult {
        let graph = steiner_example_wiki()?;
        let solution = dreyfus_wagner(&graph)?;
        assert_eq!(solution.weight, 25 + 30 + 15 + 10 + 40 + 50 + 20);
        assert_eq!(Some(solution.weight), brute_force_weight(&graph));
        assert_solution_is_consistent(&graph, &solution);
        Ok(())
    }

    #[test]
    fn test_dreyfus_wagner_paper() -> TestResult {
        let graph = steiner_example_paper()?;
        let solution = dreyfus_wagner(&graph)?;
        assert_eq!(Some(solution.weight), brute_force_weight(&graph));
        assert_solution_is_consistent(&graph, &solution);
        Ok(())
    }

    #[test]
    fn test_spoke_wheel() -> TestResult {
        let solution = dreyfus_wagner(&spoke_wheel())?;
        assert_eq!(
            solution,
            Solution {
                weight: 4,
                edges: vec![0, 1, 2, 3]
            }
        );
        Ok(())
    }

    #[test]
    fn test_single_terminal() -> TestResult {
        let mut graph = spoke_wheel();
        for t in 1..4 {
            graph.unset_terminal(t);
        }
        assert_eq!(dreyfus_wagner(&graph)?, Solution::default());
        Ok(())
    }

    #[test]
    fn test_disconnected() {
        let mut graph = Graph::new();
        graph.define_edge(0, 1, 1);
        graph.define_edge(2, 3, 1);
        graph.set_terminal(0);
        graph.set_terminal(3);
        assert!(matches!(
            dreyfus_wagner(&graph),
            Err(SteinerError::Disconnected)
        ));
    }

    #[test]
    fn test_table_size_is_checked() {
        let limit = terminal_limit(4);
        assert!(limit < usize::BITS as usize - 2);
        assert!(terminal_limit(1) >= limit);
        let bits = usize::BITS as usize - 1;
        assert!(matches!(
            Table::new(bits, 4),
            Err(SteinerError::TooManyTerminals { terminals, limit: l })
                if terminals == bits && l == limit
        ));
        assert!(matches!(
            Table::new(limit + 1, 4),
            Err(SteinerError::TooManyTerminals { .. })
        ));
        let table = Table::new(3, 4).unwrap();
        assert_eq!(table.cells.len(), 32);
        assert!(table.get(7, 3).weight.is_infinite());
    }

    #[test]
    fn test_leaf_terminals() {
        let graph = with_leaf_terminals(&spoke_wheel());
        assert_eq!(graph.num_terminals(), 4);
        assert_eq!(graph.num_vertices(), 9);
        for &t in graph.terminals() {
            assert_eq!(graph.degree(t), 1);
            let n = graph.neighbors(t).next().unwrap();
            assert!(!graph.is_terminal(n));
            assert!(graph.expect_edge(t, n).provenance().is_empty());
        }
    }
}
