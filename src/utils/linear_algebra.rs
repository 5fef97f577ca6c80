/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Linear algebra utilities using the Faer library
//!
//! Dense real least squares and small square solves used by the spectral
//! initialiser, the Levenberg-Marquardt optimiser and the Cramér-Rao bounds.

#![allow(clippy::needless_range_loop)]

use super::errors::{Result, UtilsError};
use faer::Mat;

/// Solve the linear least-squares problem `min ||A x - b||`
///
/// Uses Householder QR with column pivoting. Columns whose pivot falls below
/// `rcond * |R[0,0]|` are treated as rank deficient and receive a zero
/// coefficient, which keeps the solve stable for collinear basis spectra.
pub fn lstsq(a: &Mat<f64>, b: &[f64], rcond: f64) -> Result<Vec<f64>> {
    let m = a.nrows();
    let n = a.ncols();
    if b.len() != m {
        return Err(UtilsError::DimensionMismatch(format!(
            "design matrix has {} rows but right-hand side has {} entries",
            m,
            b.len()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut r = a.clone();
    let mut rhs = b.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();
    let steps = m.min(n);
    let mut rank = steps;

    for k in 0..steps {
        // Column pivoting on the remaining sub-column norms
        let mut pivot = k;
        let mut pivot_norm = -1.0;
        for j in k..n {
            let mut s = 0.0;
            for i in k..m {
                s += r[(i, j)] * r[(i, j)];
            }
            if s > pivot_norm {
                pivot_norm = s;
                pivot = j;
            }
        }
        if pivot != k {
            perm.swap(k, pivot);
            for i in 0..m {
                let tmp = r[(i, k)];
                r[(i, k)] = r[(i, pivot)];
                r[(i, pivot)] = tmp;
            }
        }

        let norm_x = pivot_norm.max(0.0).sqrt();
        if norm_x < f64::MIN_POSITIVE {
            rank = k;
            break;
        }

        // Householder reflector for r[k.., k]
        let alpha = if r[(k, k)] > 0.0 { -norm_x } else { norm_x };
        let mut v = vec![0.0; m - k];
        for i in k..m {
            v[i - k] = r[(i, k)];
        }
        v[0] -= alpha;
        let v_norm_sq: f64 = v.iter().map(|x| x * x).sum();
        if v_norm_sq > 0.0 {
            for j in k..n {
                let mut dot = 0.0;
                for i in k..m {
                    dot += v[i - k] * r[(i, j)];
                }
                let f = 2.0 * dot / v_norm_sq;
                for i in k..m {
                    r[(i, j)] -= f * v[i - k];
                }
            }
            let mut dot = 0.0;
            for i in k..m {
                dot += v[i - k] * rhs[i];
            }
            let f = 2.0 * dot / v_norm_sq;
            for i in k..m {
                rhs[i] -= f * v[i - k];
            }
        }
    }

    // Numerical rank from the pivoted diagonal
    let lead = r[(0, 0)].abs();
    let mut effective = 0;
    for k in 0..rank {
        if r[(k, k)].abs() > rcond * lead {
            effective = k + 1;
        } else {
            break;
        }
    }

    let mut z = vec![0.0; effective];
    for i in (0..effective).rev() {
        let mut s = rhs[i];
        for j in (i + 1)..effective {
            s -= r[(i, j)] * z[j];
        }
        z[i] = s / r[(i, i)];
    }

    let mut x = vec![0.0; n];
    for (i, zi) in z.into_iter().enumerate() {
        x[perm[i]] = zi;
    }
    Ok(x)
}

/// LU decomposition with partial pivoting
fn lu_decomposition(a: &Mat<f64>) -> Result<(Mat<f64>, Vec<usize>)> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(UtilsError::DimensionMismatch(format!(
            "LU decomposition needs a square matrix, got {}x{}",
            n,
            a.ncols()
        )));
    }
    let mut lu = a.clone();
    let mut piv: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut pivot_row = k;
        let mut pivot_val = lu[(k, k)].abs();
        for i in (k + 1)..n {
            let val = lu[(i, k)].abs();
            if val > pivot_val {
                pivot_row = i;
                pivot_val = val;
            }
        }

        if pivot_val < 1e-300 {
            return Err(UtilsError::Singular(format!("zero pivot in column {}", k)));
        }

        if pivot_row != k {
            piv.swap(k, pivot_row);
            for j in 0..n {
                let tmp = lu[(k, j)];
                lu[(k, j)] = lu[(pivot_row, j)];
                lu[(pivot_row, j)] = tmp;
            }
        }

        for i in (k + 1)..n {
            lu[(i, k)] /= lu[(k, k)];
            for j in (k + 1)..n {
                lu[(i, j)] -= lu[(i, k)] * lu[(k, j)];
            }
        }
    }

    Ok((lu, piv))
}

fn lu_solve(lu: &Mat<f64>, piv: &[usize], b: &[f64]) -> Vec<f64> {
    let n = lu.nrows();
    let mut x: Vec<f64> = piv.iter().map(|&p| b[p]).collect();

    // Forward substitution (unit lower triangle)
    for i in 0..n {
        for k in 0..i {
            x[i] -= lu[(i, k)] * x[k];
        }
    }
    // Backward substitution
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            x[i] -= lu[(i, k)] * x[k];
        }
        x[i] /= lu[(i, i)];
    }
    x
}

/// Solve the square system `A x = b`
pub fn solve(a: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>> {
    if b.len() != a.nrows() {
        return Err(UtilsError::DimensionMismatch(format!(
            "matrix has {} rows but right-hand side has {} entries",
            a.nrows(),
            b.len()
        )));
    }
    let (lu, piv) = lu_decomposition(a)?;
    Ok(lu_solve(&lu, &piv, b))
}

/// Inverse of a square matrix
pub fn inverse(a: &Mat<f64>) -> Result<Mat<f64>> {
    let n = a.nrows();
    let (lu, piv) = lu_decomposition(a)?;
    let mut inv = Mat::<f64>::zeros(n, n);
    let mut e = vec![0.0; n];
    for j in 0..n {
        e.iter_mut().for_each(|v| *v = 0.0);
        e[j] = 1.0;
        let col = lu_solve(&lu, &piv, &e);
        for i in 0..n {
            inv[(i, j)] = col[i];
        }
    }
    Ok(inv)
}
