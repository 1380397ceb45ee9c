//! Error type shared by the solver core.

use thiserror::Error;

/// Fatal conditions detected by the engine.
///
/// None of these are retried; a caller receiving one is expected to stop
/// the whole distributed run.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unrecognized {option} '{value}'")]
    UnknownOption { option: &'static str, value: String },

    #[error("invalid grid block: {0}")]
    InvalidGrid(String),

    #[error("boundary face code {0} is not in 1..=6")]
    InvalidBoundaryFace(i32),

    #[error("direction '{0}' is not one of i, j, k")]
    InvalidDirection(String),

    #[error("neither a fixed dt nor a CFL number is configured")]
    MissingTimeStep,

    #[error("slice size mismatch: window holds {expected} cells but slice holds {found}")]
    SliceMismatch { expected: usize, found: usize },

    #[error("rank {rank} is not part of connection between ranks {first} and {second}")]
    RankMismatch {
        rank: usize,
        first: usize,
        second: usize,
    },

    #[error("communication failure: {0}")]
    Communication(String),

    #[error("failed to decode message: {0}")]
    Decode(String),

    #[error("nonphysical state in block {block} at cell ({i}, {j}, {k})")]
    NonPhysical {
        block: usize,
        i: i32,
        j: i32,
        k: i32,
    },

    #[error("split index {index} is outside 1..{extent}")]
    SplitOutOfRange { index: i32, extent: i32 },

    #[error("blocks cannot be joined: {0}")]
    JoinMismatch(String),

    #[error("no matching surface found for interblock tag {0}")]
    UnmatchedInterblock(i32),

    #[error("manual decomposition needs one block per process: {blocks} blocks on {procs} processes")]
    Decomposition { blocks: usize, procs: usize },
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::Decode(err.to_string())
    }
}
