use thiserror::Error;

// Unified error type for halo-spmv

#[derive(Error, Debug)]
pub enum SpmvError {
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),
    #[error("matrix must be square to share the row partition with x (got {rows}x{cols})")]
    NonSquare { rows: usize, cols: usize },
    #[error("column {col} out of range for {global_cols} global columns")]
    ColumnOutOfRange { col: usize, global_cols: usize },
    #[error("request buffer for rank {rank} declared {declared} entries but {packed} were packed")]
    CountMismatch {
        rank: usize,
        declared: usize,
        packed: usize,
    },
    #[error("rank {from} requested global row {row}, outside the owned block {start}..{end}")]
    ForeignRequest {
        from: usize,
        row: usize,
        start: usize,
        end: usize,
    },
    #[error("invalid communication plan: {0}")]
    InvalidPlan(String),
    #[error("ghost column {0} was never discovered")]
    UndiscoveredGhost(usize),
    #[error("ghost layout for owner {owner} is {found:?}, plan expects {expected:?}")]
    LayoutMismatch {
        owner: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("plan delivers {expected} ghost values but {found} ghost columns were numbered")]
    GhostCountMismatch { expected: usize, found: usize },
    #[error("matrix columns are already renumbered")]
    AlreadyRenumbered,
    #[error("matrix columns are still global; run the inspector first")]
    NotRenumbered,
    #[error("{what} has length {got}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rank 0 could not load the matrix")]
    RootReadFailed,
    #[error("thread pool: {0}")]
    ThreadPool(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
