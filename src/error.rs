use crate::graph::VertexId;
use crate::parse::ParseError;
use thiserror::Error;

/// Errors reported by the reduction, kernelization and exact solving pipeline.
#[derive(Error, Debug)]
pub enum SteinerError {
    /// A terminal without any incident edge while other terminals exist.
    #[error("terminal {terminal} is isolated, the instance has no solution")]
    IsolatedTerminal { terminal: VertexId },

    /// Some terminals cannot be joined by any path.
    #[error("the terminals are not connected, the instance has no solution")]
    Disconnected,

    /// The exact solver's table for this many terminals cannot be allocated.
    #[error("{terminals} terminals exceed the exact solver's limit of {limit}")]
    TooManyTerminals { terminals: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type SteinerResult<T> = Result<T, SteinerError>;
