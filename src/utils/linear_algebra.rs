//! Linear algebra utilities.

use ndarray::{Array2, ArrayView2};

/// Unpivoted Cholesky factorization of a symmetric positive-definite matrix.
///
/// Computes the lower-triangular factor `L` with `A = L Lᵀ` and strictly
/// positive diagonal. Only the lower triangle of `A` is read. No pivoting is
/// performed, so the factor depends on the row order of `A` alone; callers
/// that expose factor entries as part of a serialization contract rely on
/// this.
///
/// # Arguments
/// * `a` - Square matrix to factor
///
/// # Returns
/// `Some(L)` on success, `None` if a non-positive (or non-finite) pivot is
/// encountered, i.e. the matrix is not positive-definite to working
/// precision.
///
/// # Panics
/// Panics if `a` is not square.
pub fn cholesky_lower(a: &ArrayView2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "matrix must be square");

    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }
        if !(pivot > 0.0) || !pivot.is_finite() {
            return None;
        }
        let diag = pivot.sqrt();
        l[[j, j]] = diag;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / diag;
        }
    }

    Some(l)
}
