use proptest::prelude::*;
use petgraph::unionfind::UnionFind;
use proptest::sample::Index;
use std::collections::BTreeSet;
use steiner_kernel::graph::edge_key;
use steiner_kernel::shortest_paths::ShortestPathMatrix;
use steiner_kernel::{
    dreyfus_wagner, kernelize, reduce, ClosureStrategy, Graph, KernelConfig, SteinerTree,
};

/// A connected graph: a random spanning tree plus random extra edges.
fn build(
    n: usize,
    tree: &[(Index, u64)],
    extra: &[(usize, usize, u64)],
    terminal: &[bool],
) -> Graph {
    let mut graph = Graph::with_vertices(n);
    let mut seen = BTreeSet::new();
    for (i, (parent, weight)) in tree.iter().enumerate() {
        let v = i + 1;
        let parent = parent.index(v);
        seen.insert(edge_key(parent, v));
        graph.define_edge(parent, v, *weight);
    }
    for &(a, b, weight) in extra {
        if a != b && seen.insert(edge_key(a, b)) {
            graph.define_edge(a, b, weight);
        }
    }
    for (v, _) in terminal.iter().enumerate().filter(|&(_, &t)| t) {
        graph.set_terminal(v);
    }
    if graph.num_terminals() == 0 {
        graph.set_terminal(0);
        graph.set_terminal(n - 1);
    }
    graph
}

fn instance() -> impl Strategy<Value = Graph> {
    (2usize..=12).prop_flat_map(|n| {
        (
            proptest::collection::vec((any::<Index>(), 0u64..=20), n - 1),
            proptest::collection::vec((0..n, 0..n, 0u64..=20), 0..2 * n),
            proptest::collection::vec(any::<bool>(), n),
        )
            .prop_map(move |(tree, extra, terminal)| build(n, &tree, &extra, &terminal))
    })
}

/// Up to 20 vertices with at most 12 terminals, but never more than 8 Steiner vertices
/// so the brute force stays cheap.
fn large_instance() -> impl Strategy<Value = Graph> {
    (10usize..=20)
        .prop_flat_map(|n| (Just(n), n.saturating_sub(12)..=8))
        .prop_flat_map(|(n, steiner)| {
            (
                proptest::collection::vec((any::<Index>(), 0u64..=20), n - 1),
                proptest::collection::vec((0..n, 0..n, 0u64..=20), 0..2 * n),
                proptest::sample::subsequence((0..n).collect::<Vec<_>>(), n - steiner),
            )
                .prop_map(move |(tree, extra, terminals)| {
                    let mut terminal = vec![false; n];
                    for t in terminals {
                        terminal[t] = true;
                    }
                    build(n, &tree, &extra, &terminal)
                })
        })
}

/// Minimum over all sets of Steiner vertices of a minimum spanning tree of the
/// terminals together with that set.
fn brute_force_weight(graph: &Graph) -> Option<u64> {
    let terminals = graph.terminals().clone();
    if terminals.len() <= 1 {
        return Some(0);
    }
    let steiner = graph
        .vertex_ids()
        .filter(|v| !terminals.contains(v))
        .collect::<Vec<_>>();
    let mut edges = graph
        .edges()
        .map(|e| (e.weight(), e.endpoints()))
        .collect::<Vec<_>>();
    edges.sort_unstable();
    let mut best: Option<u64> = None;
    for chosen in 0..1usize << steiner.len() {
        let mut vertices = terminals.clone();
        vertices.extend(
            (0..steiner.len())
                .filter(|i| chosen & (1 << i) != 0)
                .map(|i| steiner[i]),
        );
        let mut sets = UnionFind::<usize>::new(graph.next_vertex_id());
        let (mut weight, mut joined) = (0, 1);
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

fn configs() -> [KernelConfig; 2] {
    [
        KernelConfig::with_strategy(ClosureStrategy::Incremental),
        KernelConfig::with_strategy(ClosureStrategy::OneShot),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reduction_is_safe(graph in instance()) {
        let mut reduced = graph.clone();
        reduce(&mut reduced).unwrap();
        prop_assert_eq!(reduced.terminals(), graph.terminals());
        for v in graph.vertex_ids().filter(|&v| !reduced.contains_vertex(v)) {
            prop_assert!(!graph.is_terminal(v));
        }
        let before = ShortestPathMatrix::new(&graph);
        let after = ShortestPathMatrix::new(&reduced);
        for a in reduced.vertex_ids() {
            for b in reduced.vertex_ids() {
                prop_assert_eq!(
                    before.distance(before.index_of(a), before.index_of(b)),
                    after.distance(after.index_of(a), after.index_of(b))
                );
            }
        }
        let again = reduce(&mut reduced).unwrap();
        prop_assert!(again.is_empty());
    }

    #[test]
    fn snapshots_keep_provenance_and_shrink(graph in instance()) {
        let mut reduced = graph.clone();
        reduce(&mut reduced).unwrap();
        for config in configs() {
            let kernelization = kernelize(&reduced, &config).unwrap();
            let snapshots = kernelization.snapshots();
            prop_assert_eq!(snapshots.last().unwrap().num_terminals(), 1);
            for pair in snapshots.windows(2) {
                prop_assert!(pair[1].num_terminals() <= pair[0].num_terminals());
                prop_assert!(pair[1].num_vertices() <= pair[0].num_vertices());
            }
            for snapshot in snapshots {
                for edge in snapshot.edges() {
                    prop_assert_eq!(snapshot.provenance_weight(edge.provenance()), edge.weight());
                }
            }
        }
    }

    #[test]
    fn exact_solver_is_optimal(graph in instance()) {
        let solution = dreyfus_wagner(&graph).unwrap();
        prop_assert_eq!(Some(solution.weight), brute_force_weight(&graph));
        prop_assert_eq!(graph.provenance_weight(&solution.edges), solution.weight);
    }

    #[test]
    fn every_snapshot_yields_a_tree(graph in instance()) {
        let optimum = brute_force_weight(&graph).unwrap();
        let mut reduced = graph.clone();
        reduce(&mut reduced).unwrap();
        for config in configs() {
            let kernelization = kernelize(&reduced, &config).unwrap();
            for (index, snapshot) in kernelization.snapshots().iter().enumerate() {
                let solution = dreyfus_wagner(snapshot).unwrap();
                let tree = SteinerTree::assemble(&reduced, snapshot, &solution);
                prop_assert_eq!(tree.validate(&graph), Ok(()));
                prop_assert!(tree.weight() >= optimum);
                prop_assert!(tree.weight() <= tree.approximate_weight() + tree.exact_weight());
                if index == 0 {
                    prop_assert_eq!(tree.weight(), optimum);
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn exact_solver_is_optimal_up_to_twelve_terminals(graph in large_instance()) {
        prop_assert!(graph.num_terminals() <= 12);
        let solution = dreyfus_wagner(&graph).unwrap();
        prop_assert_eq!(Some(solution.weight), brute_force_weight(&graph));
        prop_assert_eq!(graph.provenance_weight(&solution.edges), solution.weight);
    }
}
