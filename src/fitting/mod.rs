/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Spectral fitting
//!
//! A fit builds the baseline regressor and model context once, obtains a
//! starting point from the initialiser (or the caller), and then either
//! returns it, refines it with the bounded optimiser, or refines it and
//! samples around the optimum with Metropolis-Hastings.

pub mod bounds;
pub mod config;
mod errors;
pub mod init;
pub mod mcmc;
pub mod optimizer;
pub mod search;

pub use bounds::{get_bounds, get_fitting_mask, BoundStyle, Bounds, FitMask};
pub use config::{FitConfig, FitMethod};
pub use errors::{FittingError, Result};
pub use init::{init_lorentzian, init_voigt, initialise, InitEstimate};
pub use mcmc::{McmcSamples, MetropolisHastings};
pub use optimizer::{minimize_bounded, OptimizerReport, OptimizerSettings};

use crate::model::{prepare_baseline_regressor, residual, BaselineSpec, ModelContext};
use crate::results::{FitParts, FitResult};
use crate::spectrum::{BasisSet, MetabGroups, Spectrum};
use anyhow::Context;
use log::{debug, info, warn};
use rayon::prelude::*;

/// Fit `basis` to `spectrum`
pub fn fit_model(spectrum: &Spectrum, basis: &BasisSet, config: &FitConfig) -> Result<FitResult> {
    config.validate()?;
    basis.check_compatible(spectrum)?;
    let n_points = spectrum.num_points();
    let (first, last) = spectrum.ppmlim_to_range(config.ppm_window)?;
    let baseline = BaselineSpec::from_order(config.baseline_order);
    let groups = match &config.metab_groups {
        Some(g) => MetabGroups::new(g.clone(), basis.num_basis())?,
        None => MetabGroups::single(basis.num_basis()),
    };
    let regressor = prepare_baseline_regressor(n_points, first, last, baseline.order)?;
    let ctx = ModelContext::new(spectrum, basis, regressor, groups, (first, last))?;
    let kind = config.model;
    let layout = ctx.layout(kind);

    let bounds = get_bounds(&layout, baseline.disabled, BoundStyle::Box);

    let x0 = match &config.x0 {
        Some(x) => {
            layout.check(x)?;
            let mut x = x.clone();
            let moved = bounds.clamp(&mut x);
            if moved > 0 {
                warn!("Moved {} entries of the supplied start point onto their bounds", moved);
            }
            x
        }
        None => initialise(kind, spectrum, &ctx, baseline)?,
    };
    debug!(
        "Fitting {} basis entries in {} groups over bins [{}, {}) with the {} model",
        layout.n_basis, layout.n_groups, first, last, kind
    );

    let settings = OptimizerSettings {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
    };
    let (params, samples, report) = match config.method {
        FitMethod::Init => (x0.clone(), None, None),
        FitMethod::Newton => {
            let (x, report) = minimize_bounded(kind, &ctx, &x0, &bounds, &settings);
            (x, None, Some(report))
        }
        FitMethod::Mh => {
            let (start, report) = minimize_bounded(kind, &ctx, &x0, &bounds, &settings);

            let sampler_bounds = get_bounds(&layout, baseline.disabled, BoundStyle::Sampler);
            let mask = get_fitting_mask(&layout, FitMask::default());
            let half_points = ctx.window_len() as f64 / 2.0;
            let loglik = |p: &[f64]| {
                let norm = residual(kind, p, &ctx)
                    .iter()
                    .map(|v| v.norm_sqr())
                    .sum::<f64>()
                    .sqrt();
                -norm.ln() * half_points
            };
            let sampler = MetropolisHastings::new(config.mh_burnin, config.mh_samples)
                .with_seed(config.seed);
            let chain = sampler.fit(
                loglik,
                |_| 0.0,
                &start,
                &sampler_bounds.lower,
                &sampler_bounds.upper,
                &mask,
            );
            let mean = chain.mean();
            let params = if mean.is_empty() { start } else { mean };
            (params, Some(chain), Some(report))
        }
    };
    info!(
        "Fitted {} metabolites with {} ({} model)",
        basis.num_basis(),
        config.method,
        kind
    );

    Ok(FitResult::new(FitParts {
        kind,
        method: config.method,
        params,
        x0,
        samples,
        report,
        names: basis.names().to_vec(),
        baseline,
        spectrum: spectrum.clone(),
        context: ctx,
    }))
}

/// Fit many spectra against one basis in parallel
///
/// Each fit is independent. Sampled fits are seeded with `seed + index` so
/// every spectrum gets its own reproducible chain. Results keep the input
/// order.
pub fn fit_many(spectra: &[Spectrum], basis: &BasisSet, config: &FitConfig) -> Vec<Result<FitResult>> {
    spectra
        .par_iter()
        .enumerate()
        .map(|(i, spectrum)| {
            let cfg = FitConfig {
                seed: config.seed.wrapping_add(i as u64),
                ..config.clone()
            };
            fit_model(spectrum, basis, &cfg)
        })
        .collect()
}

/// Like [`fit_many`], failing on the first spectrum that cannot be fitted
pub fn fit_many_strict(
    spectra: &[Spectrum],
    basis: &BasisSet,
    config: &FitConfig,
) -> anyhow::Result<Vec<FitResult>> {
    fit_many(spectra, basis, config)
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.with_context(|| format!("Fit of spectrum {} failed", i)))
        .collect()
}
