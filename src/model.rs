//! The interface a probabilistic model exposes to the sampler.

use ndarray::ArrayView1;

/// A target distribution known up to an additive constant on the log scale.
///
/// Implementations must be pure and deterministic for a fixed input. The
/// returned value may be non-finite: `-inf` marks a point with zero density
/// (outside the support), while `NaN` or `+inf` signal a degenerate
/// evaluation. The transition kernel has a single documented policy for all
/// three (see [`crate::sampler::acceptance_probability`]); none of them is an
/// error at this layer.
pub trait DensityModel {
    /// Number of parameters, i.e. the length of the position vectors this
    /// model evaluates.
    fn dim(&self) -> usize;

    /// Log-density (up to a constant) at the given position.
    fn log_density(&self, position: ArrayView1<f64>) -> f64;
}
