/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Bounded Levenberg-Marquardt refinement
//!
//! Each step solves the damped normal equations `(A + lambda D) dx = g` with
//! `A = Re(J^H J)`, `g = Re(J^H r)` and `D = diag(A)`, restricted to the
//! parameters that are free to move, then projects the trial point back into
//! the box. Parameters sitting on a bound with the descent direction pointing
//! outwards are held for that step.

#![allow(clippy::needless_range_loop)]

use super::bounds::Bounds;
use crate::model::{ModelContext, ModelKind};
use crate::utils::solve;
use faer::Mat;
use log::{debug, info};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
/// Gradient entries below this are treated as stationary
const GRADIENT_TOL: f64 = 1e-12;

/// Stopping rules of [`minimize_bounded`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    /// Relative loss decrease that counts as converged
    pub tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// What the optimiser reports about its run
///
/// Purely informational, the final point is returned whether or not the
/// run converged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerReport {
    pub iterations: usize,
    pub initial_loss: f64,
    pub final_loss: f64,
    pub converged: bool,
}

/// Re(J^H J) and Re(J^H r) over the fitting window
fn normal_equations(jac: &Array2<Complex64>, resid: &[Complex64]) -> (Vec<f64>, Vec<f64>) {
    let (rows, p) = jac.dim();
    let mut a = vec![0.0; p * p];
    let mut g = vec![0.0; p];
    for i in 0..p {
        for k in 0..rows {
            g[i] += (jac[(k, i)].conj() * resid[k]).re;
        }
        for j in i..p {
            let mut s = 0.0;
            for k in 0..rows {
                s += (jac[(k, i)].conj() * jac[(k, j)]).re;
            }
            a[i * p + j] = s;
            a[j * p + i] = s;
        }
    }
    (a, g)
}

/// Indices allowed to move this step
fn free_set(x: &[f64], g: &[f64], bounds: &Bounds) -> Vec<usize> {
    (0..x.len())
        .filter(|&i| {
            if bounds.is_pinned(i) {
                return false;
            }
            let at_lower = x[i] <= bounds.lower[i] && g[i] <= 0.0;
            let at_upper = x[i] >= bounds.upper[i] && g[i] >= 0.0;
            !(at_lower || at_upper)
        })
        .collect()
}

/// Minimise the model loss inside `bounds`, starting from `x0`
///
/// The start point is projected into the box first.
pub fn minimize_bounded(
    kind: ModelKind,
    ctx: &ModelContext,
    x0: &[f64],
    bounds: &Bounds,
    settings: &OptimizerSettings,
) -> (Vec<f64>, OptimizerReport) {
    let funcs = kind.functions();
    let mut x = x0.to_vec();
    bounds.clamp(&mut x);
    let mut loss = (funcs.err)(&x, ctx);
    let initial_loss = loss;
    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        iterations += 1;
        let pred = (funcs.forward)(&x, ctx);
        let resid: Vec<Complex64> = (ctx.first..ctx.last)
            .map(|t| ctx.data[t] - pred[t])
            .collect();
        let jac = (funcs.jacobian)(&x, ctx);
        let p = x.len();
        let (a, g) = normal_equations(&jac, &resid);

        let free = free_set(&x, &g, bounds);
        let max_grad = free.iter().map(|&i| g[i].abs()).fold(0.0, f64::max);
        if free.is_empty() || max_grad < GRADIENT_TOL {
            converged = true;
            break;
        }
        let max_diag = free.iter().map(|&i| a[i * p + i]).fold(0.0, f64::max);
        let floor = (max_diag * 1e-12).max(f64::MIN_POSITIVE);

        let mut improved = None;
        while lambda <= LAMBDA_MAX {
            let nf = free.len();
            let mut m = Mat::<f64>::zeros(nf, nf);
            for (r, &i) in free.iter().enumerate() {
                for (c, &j) in free.iter().enumerate() {
                    m[(r, c)] = a[i * p + j];
                }
                m[(r, r)] += lambda * a[i * p + i].max(floor);
            }
            let rhs: Vec<f64> = free.iter().map(|&i| g[i]).collect();
            let step = match solve(&m, &rhs) {
                Ok(step) => step,
                Err(_) => {
                    lambda *= 10.0;
                    continue;
                }
            };

            let mut trial = x.clone();
            for (r, &i) in free.iter().enumerate() {
                trial[i] += step[r];
            }
            bounds.clamp(&mut trial);
            let trial_loss = (funcs.err)(&trial, ctx);
            if trial_loss.is_finite() && trial_loss < loss {
                improved = Some((trial, trial_loss));
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                break;
            }
            lambda *= 10.0;
        }

        match improved {
            Some((trial, trial_loss)) => {
                let decrease = (loss - trial_loss) / loss.max(f64::MIN_POSITIVE);
                x = trial;
                loss = trial_loss;
                if decrease < settings.tolerance {
                    converged = true;
                    break;
                }
            }
            None => {
                // No damping level reduces the loss any further
                converged = true;
                break;
            }
        }
    }

    let report = OptimizerReport {
        iterations,
        initial_loss,
        final_loss: loss,
        converged,
    };
    if converged {
        debug!(
            "Optimiser converged after {} iterations, loss {:.4e} -> {:.4e}",
            iterations, initial_loss, loss
        );
    } else {
        info!(
            "Optimiser stopped at the iteration limit ({}), loss {:.4e} -> {:.4e}",
            iterations, initial_loss, loss
        );
    }
    (x, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_set_holds_active_bounds() {
        let bounds = Bounds {
            lower: vec![0.0, 0.0, 0.0, f64::NEG_INFINITY],
            upper: vec![f64::INFINITY, f64::INFINITY, 0.0, f64::INFINITY],
        };
        let x = [0.0, 0.0, 0.0, 5.0];
        // Descent pushes the first entry below zero, the second upwards
        let g = [-1.0, 1.0, 1.0, -1.0];
        assert_eq!(free_set(&x, &g, &bounds), vec![1, 3]);
    }

    #[test]
    fn test_normal_equations_of_identity() {
        let mut jac = Array2::<Complex64>::zeros((2, 2));
        jac[(0, 0)] = Complex64::new(1.0, 0.0);
        jac[(1, 1)] = Complex64::new(0.0, 1.0);
        let resid = [Complex64::new(2.0, 0.0), Complex64::new(0.0, 3.0)];
        let (a, g) = normal_equations(&jac, &resid);
        assert_eq!(a, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(g, vec![2.0, 3.0]);
    }
}
