/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Fit results
//!
//! A [`FitResult`] is produced once by the fitting entry points and never
//! changes afterwards. Derived quantities such as concentration scalings are
//! computed on demand from the result plus caller-supplied information.

#![allow(clippy::needless_range_loop)]

pub mod scaling;
pub mod summary;

pub use scaling::{ConcScalings, Scaling, ScalingRequest, WaterScalingRequest};
pub use summary::{FitSummary, MetaboliteSummary};

use crate::fitting::{FitMethod, McmcSamples, OptimizerReport};
use crate::model::{BaselineSpec, ModelContext, ModelKind, ModelParams, ParamLayout};
use crate::quantify::{self, quantify_internal, quantify_water, QuantError, WaterReference};
use crate::spectrum::{Spectrum, SpectrumError};
use crate::utils::inverse;
use anyhow::Context;
use faer::Mat;
use log::debug;
use ndarray::Array1;
use num_complex::Complex64;
use once_cell::sync::OnceCell;
use std::path::Path;

/// Everything a finished fit hands over to [`FitResult`]
pub(crate) struct FitParts {
    pub kind: ModelKind,
    pub method: FitMethod,
    pub params: Vec<f64>,
    pub x0: Vec<f64>,
    pub samples: Option<McmcSamples>,
    pub report: Option<OptimizerReport>,
    pub names: Vec<String>,
    pub baseline: BaselineSpec,
    pub spectrum: Spectrum,
    pub context: ModelContext,
}

/// Outcome of one spectral fit
#[derive(Debug, Clone)]
pub struct FitResult {
    kind: ModelKind,
    method: FitMethod,
    /// Point estimate, the sample mean for sampled fits
    params: Vec<f64>,
    x0: Vec<f64>,
    samples: Option<McmcSamples>,
    report: Option<OptimizerReport>,
    names: Vec<String>,
    baseline: BaselineSpec,
    spectrum: Spectrum,
    context: ModelContext,
    /// Parameter covariance from the Fisher information, row-major
    covariance: OnceCell<Vec<f64>>,
}

impl FitResult {
    pub(crate) fn new(parts: FitParts) -> Self {
        Self {
            kind: parts.kind,
            method: parts.method,
            params: parts.params,
            x0: parts.x0,
            samples: parts.samples,
            report: parts.report,
            names: parts.names,
            baseline: parts.baseline,
            spectrum: parts.spectrum,
            context: parts.context,
            covariance: OnceCell::new(),
        }
    }

    pub fn model(&self) -> ModelKind {
        self.kind
    }

    pub fn method(&self) -> FitMethod {
        self.method
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Starting point handed to the optimiser
    pub fn x0(&self) -> &[f64] {
        &self.x0
    }

    pub fn samples(&self) -> Option<&McmcSamples> {
        self.samples.as_ref()
    }

    pub fn report(&self) -> Option<&OptimizerReport> {
        self.report.as_ref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn layout(&self) -> ParamLayout {
        self.context.layout(self.kind)
    }

    pub fn baseline_spec(&self) -> BaselineSpec {
        self.baseline
    }

    /// Fitting window as half-open spectral indices
    pub fn window(&self) -> (usize, usize) {
        (self.context.first, self.context.last)
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    /// The observed spectrum that was fitted
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn decoded(&self) -> ModelParams {
        (self.kind.functions().x2param)(&self.params, self.context.n_basis(), self.context.n_groups())
    }

    /// Raw concentration per basis entry
    pub fn raw_conc(&self) -> Vec<f64> {
        self.params[self.layout().conc()].to_vec()
    }

    pub fn conc_of(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.params[i])
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Concentrations in the requested unit
    ///
    /// Anything other than `Raw` needs scalings from
    /// [`calculate_scalings`](Self::calculate_scalings); molality and
    /// molarity additionally need a water reference to have been used.
    pub fn conc(&self, scaling: Scaling, scalings: Option<&ConcScalings>) -> quantify::Result<Vec<f64>> {
        let raw = self.raw_conc();
        let factor = match scaling {
            Scaling::Raw => return Ok(raw),
            Scaling::Internal => scalings
                .map(|s| s.internal)
                .ok_or(QuantError::ScalingNotComputed("internal"))?,
            Scaling::Molality => scalings
                .and_then(|s| s.molality)
                .ok_or(QuantError::ScalingNotComputed("molality"))?,
            Scaling::Molarity => scalings
                .and_then(|s| s.molarity)
                .ok_or(QuantError::ScalingNotComputed("molarity"))?,
        };
        Ok(raw.iter().map(|c| c * factor).collect())
    }

    /// Full predicted spectrum
    pub fn prediction(&self) -> Array1<Complex64> {
        (self.kind.functions().forward)(&self.params, &self.context)
    }

    /// Windowed `data - prediction`
    pub fn residuals(&self) -> Array1<Complex64> {
        crate::model::residual(self.kind, &self.params, &self.context)
    }

    /// Mean squared modulus of the residuals
    pub fn mse(&self) -> f64 {
        let r = self.residuals();
        r.iter().map(|v| v.norm_sqr()).sum::<f64>() / r.len().max(1) as f64
    }

    /// Baseline contribution to the prediction
    pub fn baseline_spectrum(&self) -> Array1<Complex64> {
        let coeffs = &self.params[self.layout().baseline()];
        let b = &self.context.baseline;
        Array1::from_shape_fn(b.nrows(), |t| {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, c)| *c * b[(t, k)])
                .sum::<Complex64>()
        })
    }

    /// Predicted spectrum of the named metabolites alone, without baseline
    pub fn predicted_spectrum_of<S: AsRef<str>>(&self, names: &[S]) -> Option<Array1<Complex64>> {
        let layout = self.layout();
        let mut x = self.params.clone();
        let mut keep = vec![false; layout.n_basis];
        for name in names {
            keep[self.index_of(name.as_ref())?] = true;
        }
        for j in layout.conc() {
            if !keep[j] {
                x[j] = 0.0;
            }
        }
        for i in layout.baseline() {
            x[i] = 0.0;
        }
        Some((self.kind.functions().forward)(&x, &self.context))
    }

    /// Time-domain counterpart of [`predicted_spectrum_of`](Self::predicted_spectrum_of)
    pub fn predicted_fid_of<S: AsRef<str>>(&self, names: &[S]) -> Option<Array1<Complex64>> {
        let mut buffer = self.predicted_spectrum_of(names)?.to_vec();
        self.context.transform().signal_in_place(&mut buffer);
        Some(Array1::from(buffer))
    }

    fn covariance(&self) -> &[f64] {
        self.covariance.get_or_init(|| self.fisher_covariance())
    }

    /// Inverse of `Re(J^H J) / sigma^2` over the parameters that can move
    ///
    /// Pinned baseline terms get zero variance, parameters with no influence
    /// on the window are left as NaN.
    fn fisher_covariance(&self) -> Vec<f64> {
        let p = self.params.len();
        let jac = (self.kind.functions().jacobian)(&self.params, &self.context);
        let rows = jac.nrows();
        let noise_var = self.mse() / 2.0;
        let layout = self.layout();

        let pinned = |i: usize| self.baseline.disabled && layout.baseline().contains(&i);
        let active: Vec<usize> = (0..p)
            .filter(|&i| !pinned(i) && jac.column(i).iter().any(|v| v.norm_sqr() > 0.0))
            .collect();

        let mut cov = vec![f64::NAN; p * p];
        for i in (0..p).filter(|&i| pinned(i)) {
            for j in 0..p {
                cov[i * p + j] = 0.0;
                cov[j * p + i] = 0.0;
            }
        }
        if active.is_empty() || !(noise_var > 0.0) {
            return cov;
        }

        let n = active.len();
        let mut fisher = Mat::<f64>::zeros(n, n);
        for (a, &i) in active.iter().enumerate() {
            for (b, &j) in active.iter().enumerate().skip(a) {
                let mut s = 0.0;
                for k in 0..rows {
                    s += (jac[(k, i)].conj() * jac[(k, j)]).re;
                }
                fisher[(a, b)] = s / noise_var;
                fisher[(b, a)] = s / noise_var;
            }
        }
        match inverse(&fisher) {
            Ok(inv) => {
                for (a, &i) in active.iter().enumerate() {
                    for (b, &j) in active.iter().enumerate() {
                        cov[i * p + j] = inv[(a, b)];
                    }
                }
            }
            Err(e) => debug!("Fisher information is singular: {}", e),
        }
        cov
    }

    /// Cramér-Rao lower bound (variance) of every parameter
    pub fn crlb(&self) -> Vec<f64> {
        let p = self.params.len();
        let cov = self.covariance();
        (0..p).map(|i| cov[i * p + i]).collect()
    }

    /// Percentage standard deviation of each concentration
    pub fn perc_sd(&self) -> Vec<f64> {
        let crlb = self.crlb();
        self.layout()
            .conc()
            .map(|j| {
                let c = self.params[j];
                if c > 0.0 {
                    100.0 * crlb[j].sqrt() / c
                } else {
                    f64::INFINITY
                }
            })
            .collect()
    }

    /// Mean, spread and median of every concentration
    ///
    /// Sampled fits summarise their chain, point fits use the Cramér-Rao
    /// bound as the spread.
    pub fn summary(&self) -> Vec<MetaboliteSummary> {
        let crlb = self.crlb();
        self.names
            .iter()
            .enumerate()
            .map(|(j, name)| match &self.samples {
                Some(s) => MetaboliteSummary::from_chain(name.clone(), &s.column(j)),
                None => MetaboliteSummary::from_point(name.clone(), self.params[j], crlb[j].sqrt()),
            })
            .collect()
    }

    /// Summed concentrations of metabolite combinations, such as NAA+NAAG
    ///
    /// Combinations naming a metabolite outside the basis are skipped.
    pub fn combine(&self, combinations: &[&[&str]]) -> Vec<MetaboliteSummary> {
        let p = self.params.len();
        let mut out = Vec::new();
        for combo in combinations {
            let idx: Option<Vec<usize>> = combo.iter().map(|n| self.index_of(n)).collect();
            let Some(idx) = idx else {
                continue;
            };
            let name = combo.join("+");
            let summary = match &self.samples {
                Some(s) => {
                    let chain: Vec<f64> = s
                        .samples
                        .iter()
                        .map(|x| idx.iter().map(|&j| x[j]).sum())
                        .collect();
                    MetaboliteSummary::from_chain(name, &chain)
                }
                None => {
                    let cov = self.covariance();
                    let value = idx.iter().map(|&j| self.params[j]).sum();
                    let var: f64 = idx
                        .iter()
                        .flat_map(|&i| idx.iter().map(move |&j| (i, j)))
                        .map(|(i, j)| cov[i * p + j])
                        .sum();
                    MetaboliteSummary::from_point(name, value, var.sqrt())
                }
            };
            out.push(summary);
        }
        out
    }

    /// Scaling factors for internal and, when requested, water referencing
    pub fn calculate_scalings(&self, request: &ScalingRequest<'_>) -> quantify::Result<ConcScalings> {
        let raw = self.raw_conc();
        let internal = quantify_internal(&request.internal_reference, &raw, &self.names)?;
        let mut scalings = ConcScalings {
            internal,
            internal_reference: request.internal_reference.clone(),
            molality: None,
            molarity: None,
            info: None,
        };

        if let Some(water) = &request.water {
            let n = self.spectrum.num_points();
            if water.water.num_points() != n {
                return Err(SpectrumError::LengthMismatch {
                    expected: n,
                    found: water.water.num_points(),
                }
                .into());
            }
            let reference_fid = self
                .predicted_fid_of(&water.reference)
                .ok_or_else(|| QuantError::ReferenceNotFound(water.reference.join("+")))?
                .to_vec();
            let water_fid = water.water.fid().to_vec();
            let input = WaterReference {
                water_fid: &water_fid,
                reference_fid: &reference_fid,
                reference: &water.reference,
                reference_protons: water.reference_protons,
                reference_window: water.reference_window,
            };
            let w = quantify_water(&self.spectrum, &input, &raw, &self.names, water.info, water.consts)?;
            scalings.molality = Some(w.molality);
            scalings.molarity = Some(w.molarity);
            scalings.info = Some(w.info);
        }
        Ok(scalings)
    }

    /// Internal referencing to Cr+PCr when both are in the basis
    ///
    /// Returns `Ok(None)` when either is missing. A zero Cr+PCr total is an
    /// error.
    pub fn default_scalings(&self) -> quantify::Result<Option<ConcScalings>> {
        if self.index_of("Cr").is_none() || self.index_of("PCr").is_none() {
            debug!("Cr and PCr are not both in the basis, no default scaling");
            return Ok(None);
        }
        self.calculate_scalings(&ScalingRequest::internal(&["Cr", "PCr"]))
            .map(Some)
    }

    pub fn fit_summary(&self) -> FitSummary {
        FitSummary {
            model: self.kind,
            method: self.method,
            metabolites: self.summary(),
            perc_sd: self.perc_sd().into_iter().map(summary::finite).collect(),
            mse: self.mse(),
            params: self.params.clone(),
            report: self.report,
            acceptance_rate: self.samples.as_ref().map(|s| s.acceptance_rate.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.fit_summary())
    }

    /// Write the JSON summary to `path`
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = self.to_json().context("Failed to serialise fit summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write fit summary to {}", path.display()))?;
        Ok(())
    }
}
