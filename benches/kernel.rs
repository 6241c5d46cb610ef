use criterion::{black_box, criterion_group, criterion_main, Criterion};
use steiner_kernel::{dreyfus_wagner, kernelize, reduce, ClosureStrategy, Graph, KernelConfig};

/// A `side` x `side` grid with pseudo-random weights and every seventh vertex a terminal.
fn grid(side: usize) -> Graph {
    let mut graph = Graph::with_vertices(side * side);
    let mut state = 0x2545_f491_u64;
    let mut weight = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        1 + state % 50
    };
    for row in 0..side {
        for col in 0..side {
            let v = row * side + col;
            if col + 1 < side {
                graph.define_edge(v, v + 1, weight());
            }
            if row + 1 < side {
                graph.define_edge(v, v + side, weight());
            }
            if v % 7 == 0 {
                graph.set_terminal(v);
            }
        }
    }
    graph
}

fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    let mut instance = grid(12);
    reduce(&mut instance).unwrap();

    for strategy in [ClosureStrategy::Incremental, ClosureStrategy::OneShot] {
        let config = KernelConfig::with_strategy(strategy);
        group.bench_function(format!("kernelize_grid_12_{}", strategy), |b| {
            b.iter(|| kernelize(black_box(&instance), &config).unwrap());
        });
    }

    group.bench_function("reduce_grid_12", |b| {
        let graph = grid(12);
        b.iter(|| {
            let mut graph = graph.clone();
            reduce(black_box(&mut graph)).unwrap()
        });
    });

    // the exact solve is exponential in the terminals, so use a late snapshot
    let kernelization = kernelize(&instance, &KernelConfig::default()).unwrap();
    let snapshot = kernelization
        .snapshots()
        .iter()
        .find(|s| s.num_terminals() <= 8)
        .unwrap()
        .clone();
    group.bench_function("dreyfus_wagner_8_terminals", |b| {
        b.iter(|| dreyfus_wagner(black_box(&snapshot)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_kernel);
criterion_main!(benches);
