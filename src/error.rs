//! Error types for NQS-VMC calculations.

use nalgebra::DMatrix;
use thiserror::Error;

/// Result type for NQS-VMC operations.
pub type Result<T> = std::result::Result<T, NqsError>;

/// Errors that can occur while building or evaluating a neural quantum state.
#[derive(Error, Debug)]
pub enum NqsError {
    /// Operator matrix dimension does not match the span of a site group
    #[error(
        "operator matrix of dimension {rows} does not act on {span} site(s) \
         with {dim} local eigenvalues (expected dimension {dim}^{span})"
    )]
    OperatorShape { rows: usize, span: usize, dim: usize },

    /// A site group has a different length than the groups entered before it
    #[error("site group of length {got} entered for an operator spanning {expected} site(s)")]
    SiteSpanMismatch { expected: usize, got: usize },

    /// A site index lies outside the lattice
    #[error("site index {site} outside lattice of {lattice_size} sites")]
    SiteOutOfRange { site: usize, lattice_size: usize },

    /// Non-real wavefunction form constructed without an imaginary component
    #[error("wavefunction form {form} requires an imaginary component network")]
    MissingImagComponent { form: &'static str },

    /// Network input/output widths incompatible with the lattice
    #[error("{component} network has {kind} width {got}, expected {expected}")]
    WidthMismatch {
        component: &'static str,
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// Autoregressive operation requested on a non-autoregressive wavefunction
    #[error("operation requires an autoregressive wavefunction")]
    NotAutoregressive,

    /// Update rule only defined for scalar-output wavefunctions
    #[error("update rule does not support autoregressive wavefunctions; use the autoregressive gradient")]
    AutoregressiveUnsupported,

    /// Autoregressive wavefunctions compose conditionals exponentially
    #[error("autoregressive wavefunctions require the exponential form")]
    AutoregressiveForm,

    /// The autoregressive recurrence consumes the input layer separately
    /// from the sliced output layer
    #[error("autoregressive component networks need at least two layers")]
    AutoregressiveDepth,

    /// A configuration value is not one of the allowed local eigenvalues
    #[error("configuration value {value} is not an allowed local eigenvalue")]
    UnknownEigenvalue { value: f64 },

    /// An empty sample batch was passed where at least one sample is required
    #[error("sample batch is empty")]
    EmptyBatch,

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The regularized overlap matrix in stochastic reconfiguration is
    /// singular. Carries the unregularized S matrix for diagnostics; a
    /// degenerate parameterization is not recoverable in-process.
    #[error("singular regularized overlap matrix ({dim}x{dim}) in stochastic reconfiguration:\n{dump}")]
    SingularOverlap {
        dim: usize,
        dump: String,
        matrix: DMatrix<f64>,
    },
}

impl NqsError {
    /// Build the singular-overlap error, formatting the diagnostic dump of S.
    pub(crate) fn singular_overlap(matrix: DMatrix<f64>) -> Self {
        let dim = matrix.nrows();
        let dump = format!("{:.6e}", matrix);
        NqsError::SingularOverlap { dim, dump, matrix }
    }
}
