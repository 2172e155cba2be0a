//! Constrained-to-unconstrained parameter serialization.
//!
//! An [`UnconstrainedWriter`] appends the unconstrained image of successive
//! constrained values to a pair of ordered buffers (reals and integers).
//! Each transform inverts the matching constraining map applied by a
//! companion reader, so replaying the buffers through that reader in the
//! same call order reconstructs the original values.
//!
//! Every operation validates its full precondition before touching the
//! buffers: a failed call appends nothing.

use crate::errors::{Error, Result};
use crate::utils::linear_algebra::cholesky_lower;
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Tolerance for checking arithmetic bounds in simplex sums and matrix
/// diagonals.
pub const CONSTRAINT_TOLERANCE: f64 = 1e-8;

/// Log-odds of a probability.
fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// A writer that accumulates unconstrained values produced from constrained
/// scalar, vector and matrix inputs.
///
/// The writer's entire state is its two append-only output sequences; no
/// operation is ever undone. The exact content and ordering of the buffers
/// is the wire contract with the companion reader, which consumes them in
/// the same call order to reconstruct the constrained values.
#[derive(Debug, Clone, Default)]
pub struct UnconstrainedWriter {
    data_r: Vec<f64>,
    data_i: Vec<i64>,
}

impl UnconstrainedWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Real values written so far, in order.
    pub fn data_r(&self) -> &[f64] {
        &self.data_r
    }

    /// Integer values written so far, in order.
    pub fn data_i(&self) -> &[i64] {
        &self.data_i
    }

    /// Consume the writer, yielding the real and integer buffers.
    pub fn into_buffers(self) -> (Vec<f64>, Vec<i64>) {
        (self.data_r, self.data_i)
    }

    /// Append an integer verbatim.
    pub fn integer(&mut self, n: i64) {
        self.data_i.push(n);
    }

    /// Append an unconstrained scalar. The unconstraining map is the
    /// identity.
    pub fn scalar_unconstrain(&mut self, y: f64) {
        self.data_r.push(y);
    }

    /// Append the unconstrained image `ln y` of a non-negative scalar.
    pub fn scalar_pos_unconstrain(&mut self, y: f64) -> Result<()> {
        if !(y >= 0.0) {
            return Err(Error::Domain {
                transform: "scalar_pos_unconstrain",
                constraint: "y >= 0",
                value: y,
            });
        }
        self.data_r.push(y.ln());
        Ok(())
    }

    /// Append the unconstrained image `ln(y - lb)` of a lower-bounded scalar.
    pub fn scalar_lb_unconstrain(&mut self, lb: f64, y: f64) -> Result<()> {
        if !(y >= lb) {
            return Err(Error::Domain {
                transform: "scalar_lb_unconstrain",
                constraint: "y >= lb",
                value: y,
            });
        }
        self.data_r.push((y - lb).ln());
        Ok(())
    }

    /// Append the unconstrained image `ln(ub - y)` of an upper-bounded
    /// scalar.
    pub fn scalar_ub_unconstrain(&mut self, ub: f64, y: f64) -> Result<()> {
        if !(y <= ub) {
            return Err(Error::Domain {
                transform: "scalar_ub_unconstrain",
                constraint: "y <= ub",
                value: y,
            });
        }
        self.data_r.push((ub - y).ln());
        Ok(())
    }

    /// Append the unconstrained image `logit((y - lb) / (ub - lb))` of a
    /// scalar bounded on both sides. Requires `lb < ub`.
    pub fn scalar_lub_unconstrain(&mut self, lb: f64, ub: f64, y: f64) -> Result<()> {
        if !(ub > lb) {
            return Err(Error::Domain {
                transform: "scalar_lub_unconstrain",
                constraint: "lb < ub",
                value: ub,
            });
        }
        if !(y >= lb) {
            return Err(Error::Domain {
                transform: "scalar_lub_unconstrain",
                constraint: "y >= lb",
                value: y,
            });
        }
        if !(y <= ub) {
            return Err(Error::Domain {
                transform: "scalar_lub_unconstrain",
                constraint: "y <= ub",
                value: y,
            });
        }
        self.data_r.push(logit((y - lb) / (ub - lb)));
        Ok(())
    }

    /// Append the unconstrained image `atanh y` of a correlation value in
    /// `[-1, 1]`.
    pub fn corr_unconstrain(&mut self, y: f64) -> Result<()> {
        if !(y >= -1.0) || !(y <= 1.0) {
            return Err(Error::Domain {
                transform: "corr_unconstrain",
                constraint: "-1 <= y <= 1",
                value: y,
            });
        }
        self.data_r.push(y.atanh());
        Ok(())
    }

    /// Append the unconstrained image `logit y` of a probability in `[0, 1]`.
    pub fn prob_unconstrain(&mut self, y: f64) -> Result<()> {
        if !(y >= 0.0) || !(y <= 1.0) {
            return Err(Error::Domain {
                transform: "prob_unconstrain",
                constraint: "0 <= y <= 1",
                value: y,
            });
        }
        self.data_r.push(logit(y));
        Ok(())
    }

    /// Append the unconstrained image of a positive, nondecreasing vector:
    /// `ln y[0]` followed by the log-gaps `ln(y[k] - y[k-1])`.
    ///
    /// An empty vector appends nothing.
    pub fn pos_ordered_unconstrain(&mut self, y: ArrayView1<f64>) -> Result<()> {
        if y.is_empty() {
            return Ok(());
        }
        if !(y[0] >= 0.0) {
            return Err(Error::Domain {
                transform: "pos_ordered_unconstrain",
                constraint: "y[0] >= 0",
                value: y[0],
            });
        }
        for k in 1..y.len() {
            if !(y[k] >= y[k - 1]) {
                return Err(Error::Domain {
                    transform: "pos_ordered_unconstrain",
                    constraint: "y[k] >= y[k-1]",
                    value: y[k],
                });
            }
        }

        self.data_r.push(y[0].ln());
        for k in 1..y.len() {
            self.data_r.push((y[k] - y[k - 1]).ln());
        }
        Ok(())
    }

    /// Append the unconstrained image of a simplex of size `K`: the `K - 1`
    /// values `ln y[i] - ln y[K-1]`, i.e. log-coordinates relative to the
    /// last component. A one-element simplex appends nothing.
    ///
    /// The entries must be non-negative and sum to 1 within
    /// [`CONSTRAINT_TOLERANCE`].
    pub fn simplex_unconstrain(&mut self, y: ArrayView1<f64>) -> Result<()> {
        if y.is_empty() {
            return Err(Error::ShapeMismatch {
                expected: "simplex with at least 1 element".to_string(),
                actual: "0 elements".to_string(),
            });
        }
        let sum = y.sum();
        if !((1.0 - sum).abs() < CONSTRAINT_TOLERANCE) {
            return Err(Error::Domain {
                transform: "simplex_unconstrain",
                constraint: "sum(y) == 1 within tolerance",
                value: sum,
            });
        }
        let k_minus_1 = y.len() - 1;
        for i in 0..k_minus_1 {
            if !(y[i] >= 0.0) {
                return Err(Error::Domain {
                    transform: "simplex_unconstrain",
                    constraint: "y[i] >= 0",
                    value: y[i],
                });
            }
        }

        let log_y_k = y[k_minus_1].ln();
        for i in 0..k_minus_1 {
            self.data_r.push(y[i].ln() - log_y_k);
        }
        Ok(())
    }

    /// Append the unconstrained image of a correlation matrix: its
    /// `k(k-1)/2` atanh-transformed canonical partial correlations, in the
    /// row-major order documented on `factor_cov_matrix`.
    ///
    /// The input must be symmetric positive-definite with unit diagonal; the
    /// scale factors recovered by the factorization are checked against 1
    /// within [`CONSTRAINT_TOLERANCE`].
    pub fn corr_matrix_unconstrain(&mut self, y: ArrayView2<f64>) -> Result<()> {
        let (cpcs, sds) = factor_cov_matrix("corr_matrix_unconstrain", &y)?;
        for &sd in &sds {
            if !((sd - 1.0).abs() < CONSTRAINT_TOLERANCE) {
                return Err(Error::Domain {
                    transform: "corr_matrix_unconstrain",
                    constraint: "unit diagonal",
                    value: sd * sd,
                });
            }
        }
        self.data_r.extend_from_slice(&cpcs);
        Ok(())
    }

    /// Append the unconstrained image of a covariance matrix: its
    /// `k(k-1)/2` atanh-transformed canonical partial correlations followed
    /// by the `k` recovered positive scale factors (per-row standard
    /// deviations).
    ///
    /// The input must be symmetric positive-definite.
    pub fn cov_matrix_unconstrain(&mut self, y: ArrayView2<f64>) -> Result<()> {
        let (cpcs, sds) = factor_cov_matrix("cov_matrix_unconstrain", &y)?;
        self.data_r.extend_from_slice(&cpcs);
        self.data_r.extend_from_slice(&sds);
        Ok(())
    }
}

/// Factor a symmetric positive-definite matrix into canonical partial
/// correlations and per-row scale factors.
///
/// The scale factors are the square roots of the diagonal. The matrix is
/// rescaled to unit diagonal, factored by unpivoted Cholesky `R = L Lᵀ`, and
/// the partial correlations `z_ij` are read off the upper factor `U = Lᵀ`
/// row by row over the strict upper triangle, in the order `(0,1), (0,2),
/// ..., (0,k-1), (1,2), ..., (k-2,k-1)`, as `z_ij = U[i][j] / sqrt(acc_j)`
/// where `acc_j` accumulates `prod_{m<i} (1 - z_mj^2)`.
///
/// Both the element order and the absence of pivoting are part of the
/// serialization contract: the companion reader rebuilds `U` column by
/// column in the same order. The returned partial correlations are
/// atanh-transformed; the scale factors are returned on their natural
/// (positive) scale.
///
/// # Returns
///
/// `(cpcs, sds)` with `k(k-1)/2` transformed partial correlations and `k`
/// scale factors, or an error if the input is not square or not symmetric
/// positive-definite to working precision.
pub(crate) fn factor_cov_matrix(
    transform: &'static str,
    y: &ArrayView2<f64>,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let k = y.nrows();
    if k == 0 || y.ncols() != k {
        return Err(Error::ShapeMismatch {
            expected: "square matrix with at least 1 row".to_string(),
            actual: format!("{:?}", y.dim()),
        });
    }
    for i in 0..k {
        for j in (i + 1)..k {
            if !((y[[i, j]] - y[[j, i]]).abs() < CONSTRAINT_TOLERANCE) {
                return Err(Error::NotPositiveDefinite { transform });
            }
        }
    }

    let mut sds = Vec::with_capacity(k);
    for i in 0..k {
        let diag = y[[i, i]];
        if !(diag > 0.0) || !diag.is_finite() {
            return Err(Error::NotPositiveDefinite { transform });
        }
        sds.push(diag.sqrt());
    }

    let mut scaled = Array2::<f64>::zeros((k, k));
    for i in 0..k {
        for j in 0..k {
            scaled[[i, j]] = y[[i, j]] / (sds[i] * sds[j]);
        }
    }
    // The factorization requires an exactly-unit diagonal
    for i in 0..k {
        scaled[[i, i]] = 1.0;
    }

    let l = cholesky_lower(&scaled.view()).ok_or(Error::NotPositiveDefinite { transform })?;

    let mut cpcs = Vec::with_capacity(k * (k - 1) / 2);
    let mut acc = vec![1.0f64; k];
    for i in 0..k.saturating_sub(1) {
        for j in (i + 1)..k {
            // U[i][j] = L[j][i]
            let z = l[[j, i]] / acc[j].sqrt();
            cpcs.push(z.atanh());
            acc[j] *= 1.0 - z * z;
        }
    }

    Ok((cpcs, sds))
}
