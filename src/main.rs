//! Solve a PACE Steiner tree instance: reduce it, kernelize it, pick a kernel snapshot
//! and finish that snapshot exactly.
//! The report goes to stdout, log messages to stderr.

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use steiner_kernel::{
    dreyfus_wagner, kernelize, reduce, ClosureStrategy, DotRenderer, EdgeId, Graph, KernelConfig,
    Render, SteinerTree, VertexId,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Snapshots with at most this many terminals are solved when no selection is given.
const DEFAULT_TERMINAL_CUTOFF: usize = 12;
const ACCURACY_RANGE: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "steiner-kernel", version, about)]
struct Args {
    /// Instance in the PACE `.gr` format
    input: PathBuf,

    /// Trade speed (0) for solution quality (10)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=10))]
    accuracy: Option<u8>,

    /// Solve the first snapshot with at most this many terminals
    #[arg(short, long)]
    terminals: Option<usize>,

    /// Solve the first snapshot with at most this many Steiner vertices
    #[arg(short, long)]
    steiner_vertices: Option<usize>,

    /// Solve every snapshot, smallest first
    #[arg(long)]
    all: bool,

    /// Closure strategy: incremental or one-shot
    #[arg(long)]
    strategy: Option<ClosureStrategy>,

    /// Kernel configuration as JSON; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// First radius of the incremental closure
    #[arg(long)]
    initial_threshold: Option<u64>,

    /// Radius after which the incremental closure becomes unbounded
    #[arg(long)]
    threshold_cap: Option<u64>,

    /// Print the contraction trace
    #[arg(long)]
    trace: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the best tree in the PACE solution format
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the best tree as a Graphviz DOT drawing
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `steiner_kernel=trace`
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize, Debug)]
struct Report {
    snapshot: usize,
    snapshots: usize,
    terminals: usize,
    steiner_vertices: usize,
    weight: u64,
    approximate_weight: u64,
    exact_weight: u64,
    approximate_edges: Vec<(VertexId, VertexId)>,
    exact_edges: Vec<(VertexId, VertexId)>,
    edges: Vec<(VertexId, VertexId)>,
    solve_millis: u128,
}

impl Report {
    fn new(
        index: usize,
        snapshots: usize,
        snapshot: &Graph,
        tree: &SteinerTree,
        instance: &Graph,
        elapsed: Duration,
    ) -> Self {
        // 1-based endpoints, as in the input file
        let endpoints = |ids: &mut dyn Iterator<Item = EdgeId>| {
            ids.map(|id| {
                let (a, b) = instance.source_edge(id).endpoints;
                (a + 1, b + 1)
            })
            .collect::<Vec<_>>()
        };
        Self {
            snapshot: index,
            snapshots,
            terminals: snapshot.num_terminals(),
            steiner_vertices: snapshot.num_steiner_vertices(),
            weight: tree.weight(),
            approximate_weight: tree.approximate_weight(),
            exact_weight: tree.exact_weight(),
            approximate_edges: endpoints(&mut tree.approximate_edges().iter().copied()),
            exact_edges: endpoints(&mut tree.exact_edges().iter().copied()),
            edges: endpoints(&mut tree.edges()),
            solve_millis: elapsed.as_millis(),
        }
    }

    fn print(&self) {
        let pairs = |edges: &[(VertexId, VertexId)]| {
            edges
                .iter()
                .map(|(a, b)| format!("{}-{}", a, b))
                .collect::<Vec<_>>()
                .join(" ")
        };
        println!(
            "snapshot {} of {}: {} terminals, {} Steiner vertices",
            self.snapshot,
            self.snapshots - 1,
            self.terminals,
            self.steiner_vertices
        );
        println!(
            "weight {} (approximate {}, exact {})",
            self.weight, self.approximate_weight, self.exact_weight
        );
        println!("approximate edges: {}", pairs(&self.approximate_edges));
        println!("exact edges: {}", pairs(&self.exact_edges));
        println!("tree edges: {}", pairs(&self.edges));
        println!("solved in {} ms", self.solve_millis);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level).context("invalid --log-level")?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = kernel_config(&args)?;
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let mut instance: Graph = text
        .parse()
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    info!(
        vertices = instance.num_vertices(),
        edges = instance.num_edges(),
        terminals = instance.num_terminals(),
        "read instance"
    );
    reduce(&mut instance)?;
    let kernelization = kernelize(&instance, &config)?;
    if args.trace && !args.json {
        print!("{}", kernelization.trace());
    }

    let snapshots = kernelization.snapshots();
    let indices = if args.all {
        (0..snapshots.len()).rev().collect::<Vec<_>>()
    } else {
        vec![select_snapshot(snapshots, &args)]
    };
    let mut reports = vec![];
    let mut best: Option<SteinerTree> = None;
    for index in indices {
        let snapshot = &snapshots[index];
        info!(
            snapshot = index,
            terminals = snapshot.num_terminals(),
            "solving snapshot"
        );
        let (solution, elapsed) = measure_time(|| dreyfus_wagner(snapshot));
        let solution = solution.with_context(|| format!("failed to solve snapshot {}", index))?;
        let tree = SteinerTree::assemble(&instance, snapshot, &solution);
        tree.validate(&instance)
            .with_context(|| format!("snapshot {} produced an invalid tree", index))?;
        let report = Report::new(index, snapshots.len(), snapshot, &tree, &instance, elapsed);
        if !args.json {
            report.print();
        }
        reports.push(report);
        if best.as_ref().map_or(true, |b| tree.weight() < b.weight()) {
            best = Some(tree);
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let Some(tree) = best else {
        bail!("no snapshot was solved");
    };
    if let Some(path) = &args.output {
        let mut out = create(path)?;
        tree.write(&mut out, &instance)?;
        out.flush()?;
    }
    if let Some(path) = &args.dot {
        let kept = tree.edges().collect::<Vec<_>>();
        let exact = only(tree.exact_edges(), &kept);
        let approximate = only(tree.approximate_edges(), &kept);
        let mut out = create(path)?;
        DotRenderer::default().render(&mut out, &instance, &exact, &approximate)?;
        out.flush()?;
    }
    Ok(())
}

fn kernel_config(args: &Args) -> anyhow::Result<KernelConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            KernelConfig::from_json(&text)?
        }
        None => KernelConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(threshold) = args.initial_threshold {
        config.initial_threshold = threshold;
    }
    if args.threshold_cap.is_some() {
        config.threshold_cap = args.threshold_cap;
    }
    config.validate()?;
    Ok(config)
}

/// The smallest index any of the given cutoffs asks for; without cutoffs, the first
/// snapshot with at most [`DEFAULT_TERMINAL_CUTOFF`] terminals.
fn select_snapshot(snapshots: &[Graph], args: &Args) -> usize {
    let last = snapshots.len() - 1;
    let first_where = |pred: &dyn Fn(&Graph) -> bool| {
        snapshots.iter().position(|s| pred(s)).unwrap_or(last)
    };
    let mut candidates = vec![];
    if let Some(accuracy) = args.accuracy {
        candidates.push(accuracy_index(snapshots.len(), usize::from(accuracy)));
    }
    if let Some(cutoff) = args.terminals {
        candidates.push(first_where(&|s: &Graph| s.num_terminals() <= cutoff));
    }
    if let Some(cutoff) = args.steiner_vertices {
        candidates.push(first_where(&|s: &Graph| s.num_steiner_vertices() <= cutoff));
    }
    candidates
        .into_iter()
        .min()
        .unwrap_or_else(|| {
            first_where(&|s: &Graph| s.num_terminals() <= DEFAULT_TERMINAL_CUTOFF)
        })
}

/// Accuracy 10 keeps the input, 0 takes the last snapshot, anything in between
/// interpolates over the contracted snapshots.
fn accuracy_index(snapshots: usize, accuracy: usize) -> usize {
    let last = snapshots - 1;
    if accuracy >= ACCURACY_RANGE {
        0
    } else if accuracy == 0 {
        last
    } else {
        (1 + snapshots.saturating_sub(2) * (ACCURACY_RANGE - accuracy) / ACCURACY_RANGE).min(last)
    }
}

/// Ids of `ids` that are also in the sorted slice `kept`.
fn only(ids: &[EdgeId], kept: &[EdgeId]) -> Vec<EdgeId> {
    ids.iter()
        .copied()
        .filter(|id| kept.binary_search(id).is_ok())
        .collect()
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

// measure running time of a closure
fn measure_time<F: FnOnce() -> R, R>(closure: F) -> (R, Duration) {
    let before = Instant::now();
    let result = closure();
    (result, before.elapsed())
}
