//! Dense elimination kernels for the Newton iteration.
//!
//! Plain Gaussian elimination with partial pivoting, Gram-Schmidt rank
//! estimation and the normal-equation least-squares step. Rows whose pivot
//! falls below the tolerance are skipped and their unknowns left at zero;
//! inconsistency is never diagnosed here, the caller reports
//! non-convergence instead.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_traits::Float;

/// Pivot and convergence tolerance.
pub const EPSILON: f64 = 1e-10;
/// Squared-norm threshold below which an orthogonalized row is dependent.
pub const RANK_EPSILON: f64 = 1e-8;

/// Row rank of `a`, via Gram-Schmidt orthogonalization: each row minus its
/// projections onto the previous non-negligible rows, counting the rows
/// whose remaining squared norm exceeds `rank_epsilon`. Works on a copy.
pub fn rank<F: Float>(a: ArrayView2<F>, rank_epsilon: F) -> usize {
    let mut a = a.to_owned();
    let (rows, cols) = a.dim();
    let mut rank = 0;
    let mut row_len = vec![F::zero(); rows];

    for i in 0..rows {
        for ii in 0..i {
            if row_len[ii] <= rank_epsilon {
                continue;
            }
            let mut sum = F::zero();
            for j in 0..cols {
                sum = sum + a[[ii, j]] * a[[i, j]];
            }
            for j in 0..cols {
                let proj = a[[ii, j]] * sum / row_len[ii];
                a[[i, j]] = a[[i, j]] - proj;
            }
        }
        let mut len = F::zero();
        for j in 0..cols {
            len = len + a[[i, j]] * a[[i, j]];
        }
        if len > rank_epsilon {
            rank += 1;
        }
        row_len[i] = len;
    }
    rank
}

/// Solve the square system `a * x = b` by Gaussian elimination with partial
/// pivoting by column absolute value. A column whose pivot stays below
/// `epsilon` is treated as dependent: it is skipped and its unknown stays
/// zero. Works on copies of `a` and `b`.
pub fn solve<F: Float>(a: ArrayView2<F>, b: ArrayView1<F>, x: &mut Array1<F>, epsilon: F) {
    let mut a = a.to_owned();
    let mut b = b.to_owned();
    let (rows, cols) = a.dim();
    debug_assert_eq!(rows, cols);
    x.fill(F::zero());

    for r in 0..rows {
        let mut mr = r;
        let mut max = F::zero();
        for rr in r..rows {
            if a[[rr, r]].abs() <= max {
                continue;
            }
            max = a[[rr, r]].abs();
            mr = rr;
        }
        if max < epsilon {
            continue;
        }
        if mr != r {
            for c in 0..cols {
                let t = a[[r, c]];
                a[[r, c]] = a[[mr, c]];
                a[[mr, c]] = t;
            }
            let t = b[r];
            b[r] = b[mr];
            b[mr] = t;
        }
        for rr in (r + 1)..rows {
            let coef = a[[rr, r]] / a[[r, r]];
            for c in 0..cols {
                let t = a[[r, c]] * coef;
                a[[rr, c]] = a[[rr, c]] - t;
            }
            let t = b[r] * coef;
            b[rr] = b[rr] - t;
        }
    }

    for r in (0..rows).rev() {
        if a[[r, r]].abs() < epsilon {
            continue;
        }
        let mut xx = b[r];
        for rr in (r + 1)..cols {
            xx = xx - x[rr] * a[[r, rr]];
        }
        x[r] = xx / a[[r, r]];
    }
}

/// The minimum-norm least-squares step: form the normal equations
/// `A·Aᵀ·z = b`, solve for `z`, then `x = Aᵀ·z`. For overdetermined
/// systems this is the ordinary least-squares step. `aat` and `z` are
/// caller-provided workspaces shaped rows×rows and rows.
pub fn least_squares(
    a: ArrayView2<f64>,
    b: ArrayView1<f64>,
    aat: &mut Array2<f64>,
    z: &mut Array1<f64>,
    x: &mut Array1<f64>,
) {
    let (rows, cols) = a.dim();
    for r in 0..rows {
        for c in 0..rows {
            let mut sum = 0.0;
            for i in 0..cols {
                sum += a[[r, i]] * a[[c, i]];
            }
            aat[[r, c]] = sum;
        }
    }
    solve(aat.view(), b, z, EPSILON);
    for c in 0..cols {
        let mut sum = 0.0;
        for r in 0..rows {
            sum += z[r] * a[[r, c]];
        }
        x[c] = sum;
    }
}
