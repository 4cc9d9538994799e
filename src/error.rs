use crate::lattice::Cell;

/// Errors raised by the engine.
///
/// Two of these are recoverable and reported to the caller with no state
/// mutated (`InvalidMove`, the file failures); the rest indicate defects in
/// the calling code and simply propagate. The engine never swallows an error
/// that would leave a matrix in a non-row-stochastic state: normalization is
/// always the last step of any mutating operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An externally supplied move references a zero-probability cell.
    /// Recoverable; the collaborator that owns the input should re-prompt.
    #[error("move references a zero-probability cell at {0}")]
    InvalidMove(Cell),

    /// Decision or learning logic addressed a cell outside the lattice.
    /// A programming-error condition, not an expected game state.
    #[error("cell {0} lies outside the lattice")]
    OutsideLattice(Cell),

    /// Gradient descent is intentionally unimplemented; fails fast with no
    /// partial mutation rather than substituting a guessed update.
    #[error("gradient descent learning is not implemented")]
    UnsupportedLearningMethod,

    /// A rule id outside the recognized 0..=6 range was requested.
    #[error("unknown learning method id {0}")]
    UnknownLearningMethod(u8),

    /// A divergence id outside the recognized 0..=3 range was requested.
    #[error("unknown divergence id {0}")]
    UnknownDivergence(u8),

    /// A strategy file failed structural validation. The in-memory matrices
    /// are untouched when this is returned.
    #[error("malformed strategy file: {0}")]
    MalformedStrategy(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Strategy or series file I/O failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
