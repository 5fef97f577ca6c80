/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Starting points for the nonlinear fit
//!
//! Both strategies reduce the problem to a handful of shared line-shape terms
//! that are searched with Nelder-Mead, solving the linear terms exactly for
//! each trial point.

#![allow(clippy::needless_range_loop)]

use super::errors::Result;
use super::search::nelder_mead;
use crate::model::{BaselineSpec, ModelContext, ModelKind, ParamLayout};
use crate::spectrum::Spectrum;
use crate::utils::lstsq;
use faer::Mat;
use log::debug;
use num_complex::Complex64;

/// Relative pivot threshold for the linear solves
const RCOND: f64 = 1e-10;
const MAX_SEARCH_ITERS: u64 = 400;

/// Shared line-shape estimate with the matching linear terms
#[derive(Debug, Clone, PartialEq)]
pub struct InitEstimate {
    pub gamma: f64,
    /// Gaussian broadening, Voigt only
    pub sigma: Option<f64>,
    pub eps: f64,
    pub conc: Vec<f64>,
    /// Baseline coefficients, empty when not estimated
    pub baseline: Vec<f64>,
}

impl InitEstimate {
    /// Broadcast the shared terms to every group and assemble a full vector
    ///
    /// Phases start at zero, and so does the baseline unless it was estimated.
    pub fn to_x0(&self, layout: &ParamLayout) -> Vec<f64> {
        let mut x = vec![0.0; layout.len()];
        x[layout.conc()].copy_from_slice(&self.conc);
        for i in layout.gamma() {
            x[i] = self.gamma;
        }
        if let (Some(range), Some(sigma)) = (layout.sigma(), self.sigma) {
            for i in range {
                x[i] = sigma;
            }
        }
        for i in layout.eps() {
            x[i] = self.eps;
        }
        if self.baseline.len() == layout.n_baseline {
            x[layout.baseline()].copy_from_slice(&self.baseline);
        }
        x
    }
}

/// Windowed real design matrix, real parts stacked over imaginary parts
struct LorentzianDesign<'a> {
    ctx: &'a ModelContext,
    target: Vec<f64>,
    with_baseline: bool,
}

impl<'a> LorentzianDesign<'a> {
    fn new(ctx: &'a ModelContext, with_baseline: bool) -> Self {
        let data = ctx.windowed_data();
        let target = data
            .iter()
            .map(|v| v.re)
            .chain(data.iter().map(|v| v.im))
            .collect();
        Self {
            ctx,
            target,
            with_baseline,
        }
    }

    fn n_cols(&self) -> usize {
        let nb = if self.with_baseline {
            self.ctx.n_baseline()
        } else {
            0
        };
        self.ctx.n_basis() + nb
    }

    fn matrix(&self, gamma: f64, eps: f64) -> Mat<f64> {
        let ctx = self.ctx;
        let w = ctx.window_len();
        let n_points = ctx.num_points();
        let mut m = Mat::<f64>::zeros(2 * w, self.n_cols());

        let decay: Vec<Complex64> = ctx
            .time
            .iter()
            .map(|&t| (-Complex64::new(gamma, eps) * t).exp())
            .collect();
        let mut buffer = vec![Complex64::new(0.0, 0.0); n_points];
        for j in 0..ctx.n_basis() {
            for t in 0..n_points {
                buffer[t] = ctx.basis[(t, j)] * decay[t];
            }
            ctx.transform().spectrum_in_place(&mut buffer);
            for r in 0..w {
                let v = buffer[ctx.first + r];
                m[(r, j)] = v.re;
                m[(w + r, j)] = v.im;
            }
        }
        if self.with_baseline {
            let offset = ctx.n_basis();
            for k in 0..ctx.n_baseline() {
                for r in 0..w {
                    let v = ctx.baseline[(ctx.first + r, k)];
                    m[(r, offset + k)] = v.re;
                    m[(w + r, offset + k)] = v.im;
                }
            }
        }
        m
    }

    /// Linear coefficients with concentrations projected onto >= 0
    fn solve(&self, design: &Mat<f64>) -> Result<Vec<f64>> {
        let mut beta = lstsq(design, &self.target, RCOND)?;
        for c in beta.iter_mut().take(self.ctx.n_basis()) {
            *c = c.max(0.0);
        }
        Ok(beta)
    }

    fn mean_squared_error(&self, design: &Mat<f64>, beta: &[f64]) -> f64 {
        let mut total = 0.0;
        for i in 0..design.nrows() {
            let mut pred = 0.0;
            for j in 0..design.ncols() {
                pred += design[(i, j)] * beta[j];
            }
            total += (pred - self.target[i]).powi(2);
        }
        total / design.nrows() as f64
    }

    fn loss(&self, log_gamma: f64, eps: f64) -> f64 {
        let design = self.matrix(log_gamma.exp(), eps);
        match self.solve(&design) {
            Ok(beta) => self.mean_squared_error(&design, &beta),
            Err(_) => f64::INFINITY,
        }
    }
}

/// Lorentzian starting point
///
/// Searches `(ln gamma, eps)` from `gamma = 1e-5, eps = 0`. For every trial
/// the windowed concentrations and baseline coefficients are solved by real
/// least squares, and the concentrations are clipped to be non-negative. A
/// disabled baseline is left out of the solve and seeded with zeros.
pub fn init_lorentzian(ctx: &ModelContext, baseline: BaselineSpec) -> Result<InitEstimate> {
    let design = LorentzianDesign::new(ctx, !baseline.disabled);
    let search = nelder_mead(
        |p| design.loss(p[0], p[1]),
        &[1e-5f64.ln(), 0.0],
        &[10.0, 10.0],
        MAX_SEARCH_ITERS,
    )?;

    let gamma = search.param[0].exp();
    let eps = search.param[1];
    let matrix = design.matrix(gamma, eps);
    let beta = design.solve(&matrix)?;
    let n = ctx.n_basis();
    let conc = beta[..n].to_vec();
    let coeffs = if baseline.disabled {
        Vec::new()
    } else {
        beta[n..].to_vec()
    };

    debug!(
        "Lorentzian init: gamma={:.4}, eps={:.4}, loss={:.4e} after {} iterations",
        gamma, eps, search.cost, search.iterations
    );
    Ok(InitEstimate {
        gamma,
        sigma: None,
        eps,
        conc,
        baseline: coeffs,
    })
}

/// Modulus of the normalised inner product of two spectra
fn normalised_correlation(a: &[Complex64], b: &[Complex64]) -> f64 {
    let mut cross = Complex64::new(0.0, 0.0);
    let mut na = 0.0;
    let mut nb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cross += x.conj() * y;
        na += x.norm_sqr();
        nb += y.norm_sqr();
    }
    let denom = (na * nb).sqrt();
    if denom > 0.0 {
        cross.norm() / denom
    } else {
        0.0
    }
}

fn voigt_decay(t: f64, gamma: f64, sigma: f64, eps: f64) -> Complex64 {
    (-Complex64::new(gamma + sigma * sigma * t, eps) * t).exp()
}

/// Voigt starting point
///
/// Blurs and shifts the sum of all basis signals to best correlate with the
/// observed spectrum inside the nucleus' reference ppm range, searching from
/// `(gamma, sigma, eps) = (1, 0, 0)`. Concentrations then come from an
/// unconstrained time-domain least-squares solve, without the
/// non-negativity clip of the Lorentzian path.
pub fn init_voigt(spectrum: &Spectrum, ctx: &ModelContext) -> Result<InitEstimate> {
    let (first, last) = match spectrum.nucleus().default_ppm_range() {
        Some(range) => spectrum.ppm_window_to_indices(range)?,
        None => (ctx.first, ctx.last),
    };
    let n_points = ctx.num_points();
    let target = ctx.data.slice(ndarray::s![first..last]).to_vec();
    let summed: Vec<Complex64> = ctx.basis.rows().into_iter().map(|row| row.sum()).collect();

    let cost = |p: &[f64]| {
        let mut buffer: Vec<Complex64> = summed
            .iter()
            .zip(ctx.time.iter())
            .map(|(b, &t)| b * voigt_decay(t, p[0], p[1], p[2]))
            .collect();
        ctx.transform().spectrum_in_place(&mut buffer);
        1.0 - normalised_correlation(&buffer[first..last], &target)
    };
    let search = nelder_mead(cost, &[1.0, 0.0, 0.0], &[5.0, 5.0, 10.0], MAX_SEARCH_ITERS)?;
    let (gamma, sigma, eps) = (search.param[0], search.param[1], search.param[2]);

    let n = ctx.n_basis();
    let mut design = Mat::<f64>::zeros(2 * n_points, n);
    for j in 0..n {
        for t in 0..n_points {
            let v = ctx.basis[(t, j)] * voigt_decay(ctx.time[t], gamma, sigma, eps);
            design[(t, j)] = v.re;
            design[(n_points + t, j)] = v.im;
        }
    }
    let fid = spectrum.fid();
    let data: Vec<f64> = fid
        .iter()
        .map(|v| v.re)
        .chain(fid.iter().map(|v| v.im))
        .collect();
    let conc = lstsq(&design, &data, RCOND)?;

    debug!(
        "Voigt init: gamma={:.4}, sigma={:.4}, eps={:.4}, correlation={:.4}",
        gamma,
        sigma,
        eps,
        1.0 - search.cost
    );
    // The model only depends on sigma squared
    Ok(InitEstimate {
        gamma: gamma.max(0.0),
        sigma: Some(sigma.abs()),
        eps,
        conc,
        baseline: Vec::new(),
    })
}

/// Full starting vector for `kind`
pub fn initialise(
    kind: ModelKind,
    spectrum: &Spectrum,
    ctx: &ModelContext,
    baseline: BaselineSpec,
) -> Result<Vec<f64>> {
    let estimate = match kind {
        ModelKind::Lorentzian => init_lorentzian(ctx, baseline)?,
        ModelKind::Voigt => init_voigt(spectrum, ctx)?,
    };
    Ok(estimate.to_x0(&ctx.layout(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_is_scale_and_phase_invariant() {
        let a: Vec<Complex64> = (0..8).map(|i| Complex64::new(i as f64, 1.0)).collect();
        let b: Vec<Complex64> = a.iter().map(|v| v * Complex64::new(0.0, 3.0)).collect();
        assert!((normalised_correlation(&a, &b) - 1.0).abs() < 1e-12);
        assert_eq!(normalised_correlation(&a, &[Complex64::new(0.0, 0.0); 8]), 0.0);
    }

    #[test]
    fn test_estimate_broadcasts_to_groups() {
        let layout = ParamLayout::new(ModelKind::Voigt, 3, 2, 2);
        let est = InitEstimate {
            gamma: 4.0,
            sigma: Some(2.0),
            eps: -1.0,
            conc: vec![1.0, 2.0, 3.0],
            baseline: Vec::new(),
        };
        let x = est.to_x0(&layout);
        assert_eq!(&x[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&x[3..5], &[4.0, 4.0]);
        assert_eq!(&x[5..7], &[2.0, 2.0]);
        assert_eq!(&x[7..9], &[-1.0, -1.0]);
        assert!(x[9..].iter().all(|v| *v == 0.0));
    }
}
