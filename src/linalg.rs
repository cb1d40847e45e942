//! Linear algebra for the weighted normal equations
//!
//! X'WX is symmetric positive definite whenever X has full column rank and
//! every weight is positive, so everything here goes through a Cholesky
//! factor. With the `blas` feature the factorization is delegated to LAPACK.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

#[cfg(feature = "blas")]
use ndarray_linalg::{FactorizeC, InverseC, SolveC, UPLO};

/// Pivots below this fraction of the largest diagonal entry count as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinalgError {
    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Matrix is not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },
}

pub type LinalgResult<T> = std::result::Result<T, LinalgError>;

/// X'WX for a diagonal W given by `w`
pub fn compute_xtwx(x: &Array2<f64>, w: &Array1<f64>) -> Array2<f64> {
    let xw = x * &w.view().insert_axis(Axis(1));
    xw.t().dot(x)
}

/// X'Wz for a diagonal W given by `w`
pub fn compute_xtwz(x: &Array2<f64>, w: &Array1<f64>, z: &Array1<f64>) -> Array1<f64> {
    let wz = w * z;
    x.t().dot(&wz)
}

fn check_square(a: &Array2<f64>) -> LinalgResult<usize> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    Ok(rows)
}

fn pivot_threshold(a: &Array2<f64>) -> LinalgResult<f64> {
    let scale = a.diag().iter().fold(0.0f64, |m, d| m.max(d.abs()));
    if !(scale.is_finite() && scale > 0.0) {
        return Err(LinalgError::NotPositiveDefinite { pivot: 0 });
    }
    Ok(scale * PIVOT_TOLERANCE)
}

/// Lower Cholesky factor L with A = LL'
pub fn cholesky(a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    let n = check_square(a)?;
    let threshold = pivot_threshold(a)?;
    let mut l = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        // also rejects NaN
        if !(d > threshold) {
            return Err(LinalgError::NotPositiveDefinite { pivot: j });
        }
        let ljj = d.sqrt();
        l[[j, j]] = ljj;

        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / ljj;
        }
    }

    Ok(l)
}

/// Solve LL'x = b given the lower factor L
pub fn cholesky_solve(l: &Array2<f64>, b: ArrayView1<f64>) -> LinalgResult<Array1<f64>> {
    let n = check_square(l)?;
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    // Forward substitution: Ly = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }

    // Back substitution: L'x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Ok(x)
}

/// Solve Ax = b for symmetric positive definite A
#[cfg(not(feature = "blas"))]
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> LinalgResult<Array1<f64>> {
    let l = cholesky(a)?;
    cholesky_solve(&l, b.view())
}

/// Solve Ax = b for symmetric positive definite A
#[cfg(feature = "blas")]
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> LinalgResult<Array1<f64>> {
    let n = check_square(a)?;
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    let factor = lapack_factor(a)?;
    factor
        .solvec(b)
        .map_err(|_| LinalgError::NotPositiveDefinite { pivot: 0 })
}

/// Inverse of a symmetric positive definite matrix, column by column from
/// one Cholesky factor
#[cfg(not(feature = "blas"))]
pub fn spd_inverse(a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    let n = check_square(a)?;
    let l = cholesky(a)?;
    let mut inv = Array2::<f64>::zeros((n, n));
    let mut e = Array1::<f64>::zeros(n);
    for j in 0..n {
        e.fill(0.0);
        e[j] = 1.0;
        let col = cholesky_solve(&l, e.view())?;
        inv.column_mut(j).assign(&col);
    }
    Ok(inv)
}

/// Inverse of a symmetric positive definite matrix via LAPACK potri
#[cfg(feature = "blas")]
pub fn spd_inverse(a: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    check_square(a)?;
    let factor = lapack_factor(a)?;
    factor
        .invc()
        .map_err(|_| LinalgError::NotPositiveDefinite { pivot: 0 })
}

#[cfg(feature = "blas")]
fn lapack_factor(
    a: &Array2<f64>,
) -> LinalgResult<ndarray_linalg::cholesky::CholeskyFactorized<ndarray::OwnedRepr<f64>>> {
    let threshold = pivot_threshold(a)?;
    let factor = a
        .factorizec(UPLO::Lower)
        .map_err(|_| LinalgError::NotPositiveDefinite { pivot: 0 })?;
    // LAPACK accepts tiny positive pivots that the pure-Rust path rejects
    for (j, d) in factor.factor.diag().iter().enumerate() {
        if !(d * d > threshold) {
            return Err(LinalgError::NotPositiveDefinite { pivot: j });
        }
    }
    Ok(factor)
}
