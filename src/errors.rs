use thiserror::Error;

/// Error type for invalid operations.
///
/// Domain violations in the unconstraining transforms are contract breaches:
/// the offending call fails fast and appends nothing. Non-finite density
/// evaluations are deliberately *not* represented here; the transition kernel
/// treats them as sampling events (see [`crate::sampler`]).
#[derive(Error, Debug)]
pub enum Error {
    /// A constrained input fell outside the domain of an unconstraining
    /// transform. Carries the transform name, the constraint that failed and
    /// the offending value.
    #[error("{transform}: value {value} violates `{constraint}`")]
    Domain {
        transform: &'static str,
        constraint: &'static str,
        value: f64,
    },

    /// A matrix input could not be factored because it is not symmetric
    /// positive-definite.
    #[error("{transform}: matrix is not symmetric positive-definite")]
    NotPositiveDefinite { transform: &'static str },

    /// Ensemble sampling requires at least two walkers.
    #[error("ensemble must contain at least 2 walkers, got {0}")]
    TooFewWalkers(usize),

    /// An input had a different shape than expected.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Convenience type for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
