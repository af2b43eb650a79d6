#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a search space is built without any variables.
    #[error("search space must contain at least one variable")]
    EmptySearchSpace,

    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a discrete, ordinal or nominal variable has no values.
    #[error("variable '{name}' has no choices")]
    EmptyChoices {
        /// The name of the offending variable.
        name: String,
    },

    /// Returned when the optimizer is built over a variable type it cannot handle.
    #[error("dimension {dim} has unsupported variable type '{kind}'")]
    UnsupportedVariable {
        /// Index of the dimension in the full point.
        dim: usize,
        /// Short name of the variable type.
        kind: &'static str,
    },

    /// Returned when fewer random candidates than gradient restarts are configured.
    #[error("n_cand ({n_cand}) must be at least n_restarts ({n_restarts})")]
    CandidatesBelowRestarts {
        /// Configured candidate pool size.
        n_cand: usize,
        /// Configured number of local-search restarts.
        n_restarts: usize,
    },

    /// Returned when a continuous optimizer is requested by an unknown name.
    #[error("continuous optimizer '{0}' is not implemented")]
    UnknownOptimizer(String),

    /// Returned when the learning rate is not a positive finite number.
    #[error("invalid learning rate: {0} must be positive and finite")]
    InvalidLearningRate(f64),

    /// Returned when a trust-region manager is handed to the optimizer.
    #[error("the bandit acquisition optimizer does not support trust regions")]
    TrustRegionUnsupported,

    /// Returned when the restart/candidate configuration cannot fill the batch.
    #[error(
        "cannot produce {n_suggestions} suggestions with n_restarts = {n_restarts} and n_cand = {n_cand}"
    )]
    InsufficientCandidates {
        /// Number of points requested.
        n_suggestions: usize,
        /// Configured number of local-search restarts.
        n_restarts: usize,
        /// Configured candidate pool size.
        n_cand: usize,
    },

    /// Returned when a vector has the wrong length for the search space.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch {
        /// The expected length.
        expected: usize,
        /// The actual length.
        got: usize,
    },

    /// Returned when a categorical code is not a valid integer category.
    #[error("invalid category {value} at categorical position {position}")]
    InvalidCategory {
        /// Position inside the categorical sub-vector.
        position: usize,
        /// The rejected encoded value.
        value: f64,
    },

    /// Returned when a surrogate model fails to refit.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
