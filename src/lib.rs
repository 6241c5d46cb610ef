//! Steiner trees by lossy star-contraction kernelization followed by an exact
//! Dreyfus-Wagner solve of the remaining kernel.

pub mod config;
pub mod error;
pub mod graph;
pub mod parse;
pub mod reduce;
pub mod render;
pub mod shortest_paths;
pub mod steiner_tree;
pub mod util;

pub use config::{ClosureStrategy, KernelConfig};
pub use error::{SteinerError, SteinerResult};
pub use graph::{EdgeId, EdgeWeight, Graph, VertexId};
pub use reduce::{reduce, Reduction};
pub use render::{DotRenderer, Render};
pub use steiner_tree::dreyfus_wagner::{dreyfus_wagner, Solution};
pub use steiner_tree::kernel::{kernelize, Contraction, Kernelization};
pub use steiner_tree::tree::{SteinerTree, TreeError};
