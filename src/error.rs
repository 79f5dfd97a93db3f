use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Matching failed at pair ({row}, {col}): {cause}")]
    Matching {
        row: usize,
        col: usize,
        #[source]
        cause: Box<MatchError>,
    },

    #[error("Matching interrupted: {completed} of {total} pairs compared")]
    Interrupted { completed: u64, total: u64 },

    #[error("Unknown node: {0}")]
    UnknownNode(usize),

    #[error("Tree error: {0}")]
    Tree(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MatchError {
    /// Wrap a collaborator failure as the failure of one node comparison.
    pub fn matching(row: usize, col: usize, cause: MatchError) -> Self {
        match cause {
            already @ MatchError::Matching { .. } => already,
            cause => MatchError::Matching {
                row,
                col,
                cause: Box::new(cause),
            },
        }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
