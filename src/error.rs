use thiserror::Error;

/// Failures reported by the least-squares solver.
///
/// These are surfaced verbatim to the caller; the fitting engine never retries
/// or perturbs the problem after one of them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The iteration budget was exhausted or the damping saturated before any
    /// tolerance was met.
    #[error("Optimal parameters not found: {0}")]
    ConvergenceFailure(String),

    /// The Jacobian at the solution is rank deficient, so JᵀJ has no inverse.
    #[error("Covariance of the parameters could not be estimated: {0}")]
    SingularJacobian(String),

    /// Inconsistent shapes or values handed to the solver.
    #[error("Improper input: {0}")]
    InvalidInput(String),

    /// The model produced non-finite values.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// The covariance matrix contains non-finite entries.
    #[error("Invalid covariance: {0}")]
    InvalidCovariance(String),
}

/// Preconditions checked before the solver is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    #[error("no free parameters: at least one fit parameter must be free")]
    NoFreeParameters,

    #[error(
        "insufficient degrees of freedom: {points} data point(s) for {free} free parameter(s); \
         add data points or free fewer parameters"
    )]
    InsufficientDegreesOfFreedom { points: usize, free: usize },
}

/// Error types for the curvefit-rs library.
#[derive(Error, Debug)]
pub enum CurveFitError {
    /// Malformed construction inputs (mismatched lengths, duplicate names, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A fit precondition was not met.
    #[error("Fit error: {0}")]
    Fit(#[from] FitError),

    /// The solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CurveFitError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CurveFitError::Validation(message.into())
    }
}

/// Result type alias for curvefit-rs operations.
pub type Result<T> = std::result::Result<T, CurveFitError>;
