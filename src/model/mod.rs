/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Parametric spectral models
//!
//! A model predicts the observed spectrum as a sum of basis spectra, each
//! broadened and shifted by its group's line-shape parameters, weighted by a
//! concentration, rotated by a zero/first-order phase and offset by a
//! polynomial baseline. All components share one flat parameter layout:
//!
//! ```text
//! [ conc (n) | gamma (g) | sigma (g, Voigt only) | eps (g) | phi0 | phi1 | baseline (2(order+1)) ]
//! ```
//!
//! [`ParamLayout`] owns the index arithmetic, [`ModelParams`] is the decoded
//! form, and [`ModelKind::functions`] resolves the bundle of model operations
//! once per fit.

pub mod baseline;
mod engine;
mod errors;
pub mod lorentzian;
pub mod voigt;

pub use baseline::{prepare_baseline_regressor, BaselineSpec};
pub use errors::{ModelError, Result};

use crate::spectrum::{BasisSet, MetabGroups, SpectralTransform, Spectrum};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Line-shape variant of the forward model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Single Lorentzian broadening term per group
    #[default]
    Lorentzian,
    /// Lorentzian plus Gaussian broadening per group
    Voigt,
}

impl ModelKind {
    /// Broadening parameters per metabolite group
    pub fn num_broadening(self) -> usize {
        match self {
            ModelKind::Lorentzian => 1,
            ModelKind::Voigt => 2,
        }
    }

    /// Operations implementing this model
    pub fn functions(self) -> &'static ModelFunctions {
        match self {
            ModelKind::Lorentzian => &lorentzian::FUNCTIONS,
            ModelKind::Voigt => &voigt::FUNCTIONS,
        }
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lorentzian" => Ok(ModelKind::Lorentzian),
            "voigt" => Ok(ModelKind::Voigt),
            _ => Err(ModelError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Lorentzian => write!(f, "lorentzian"),
            ModelKind::Voigt => write!(f, "voigt"),
        }
    }
}

/// Bundle of operations shared by every model variant
pub struct ModelFunctions {
    /// Half the residual power over the fitting window
    pub err: fn(&[f64], &ModelContext) -> f64,
    /// Analytic gradient of `err`
    pub grad: fn(&[f64], &ModelContext) -> Vec<f64>,
    /// Full-length predicted spectrum
    pub forward: fn(&[f64], &ModelContext) -> Array1<Complex64>,
    /// Split a flat vector given basis and group counts
    pub x2param: fn(&[f64], usize, usize) -> ModelParams,
    /// Complex derivative of the windowed prediction, (window x params)
    pub jacobian: fn(&[f64], &ModelContext) -> Array2<Complex64>,
}

/// Index arithmetic for the fixed parameter layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamLayout {
    pub kind: ModelKind,
    pub n_basis: usize,
    pub n_groups: usize,
    pub n_baseline: usize,
}

impl ParamLayout {
    pub fn new(kind: ModelKind, n_basis: usize, n_groups: usize, n_baseline: usize) -> Self {
        Self {
            kind,
            n_basis,
            n_groups,
            n_baseline,
        }
    }

    /// Layout implied by a vector of length `len`, the baseline taking the remainder
    pub fn from_len(kind: ModelKind, n_basis: usize, n_groups: usize, len: usize) -> Self {
        let fixed = n_basis + (kind.num_broadening() + 1) * n_groups + 2;
        Self::new(kind, n_basis, n_groups, len.saturating_sub(fixed))
    }

    pub fn len(&self) -> usize {
        self.n_basis + (self.kind.num_broadening() + 1) * self.n_groups + 2 + self.n_baseline
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn conc(&self) -> Range<usize> {
        0..self.n_basis
    }

    /// Broadening block `k` (0 = gamma, 1 = sigma)
    pub fn broadening(&self, k: usize) -> Range<usize> {
        let start = self.n_basis + k * self.n_groups;
        start..start + self.n_groups
    }

    pub fn gamma(&self) -> Range<usize> {
        self.broadening(0)
    }

    pub fn sigma(&self) -> Option<Range<usize>> {
        match self.kind {
            ModelKind::Voigt => Some(self.broadening(1)),
            ModelKind::Lorentzian => None,
        }
    }

    pub fn eps(&self) -> Range<usize> {
        self.broadening(self.kind.num_broadening())
    }

    pub fn phi0(&self) -> usize {
        self.eps().end
    }

    pub fn phi1(&self) -> usize {
        self.eps().end + 1
    }

    pub fn baseline(&self) -> Range<usize> {
        let start = self.eps().end + 2;
        start..start + self.n_baseline
    }

    /// Check a vector's length against the layout
    pub fn check(&self, x: &[f64]) -> Result<()> {
        if x.len() != self.len() {
            return Err(ModelError::LayoutMismatch {
                expected: self.len(),
                found: x.len(),
            });
        }
        Ok(())
    }

    /// Decode a flat vector into named blocks
    pub fn decode(&self, x: &[f64]) -> ModelParams {
        ModelParams {
            conc: x[self.conc()].to_vec(),
            gamma: x[self.gamma()].to_vec(),
            sigma: self.sigma().map(|r| x[r].to_vec()),
            eps: x[self.eps()].to_vec(),
            phi0: x[self.phi0()],
            phi1: x[self.phi1()],
            baseline: x[self.baseline()].to_vec(),
        }
    }
}

/// Decoded model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// One per basis entry
    pub conc: Vec<f64>,
    /// Lorentzian broadening per group (1/s)
    pub gamma: Vec<f64>,
    /// Gaussian broadening per group, Voigt model only
    pub sigma: Option<Vec<f64>>,
    /// Frequency shift per group (rad/s)
    pub eps: Vec<f64>,
    /// Zero-order phase (rad)
    pub phi0: f64,
    /// First-order phase (rad/Hz)
    pub phi1: f64,
    /// Baseline coefficients, alternating real/imaginary per order
    pub baseline: Vec<f64>,
}

impl ModelParams {
    /// Flatten back into the layout `x2param` decodes
    pub fn to_vector(&self) -> Vec<f64> {
        let mut x = Vec::with_capacity(
            self.conc.len() + 3 * self.gamma.len() + 2 + self.baseline.len(),
        );
        x.extend_from_slice(&self.conc);
        x.extend_from_slice(&self.gamma);
        if let Some(sigma) = &self.sigma {
            x.extend_from_slice(sigma);
        }
        x.extend_from_slice(&self.eps);
        x.push(self.phi0);
        x.push(self.phi1);
        x.extend_from_slice(&self.baseline);
        x
    }

    pub fn kind(&self) -> ModelKind {
        if self.sigma.is_some() {
            ModelKind::Voigt
        } else {
            ModelKind::Lorentzian
        }
    }
}

/// Fixed inputs shared by every model evaluation in one fit
#[derive(Debug, Clone)]
pub struct ModelContext {
    /// Frequency of each spectral bin (Hz)
    pub frequency: Array1<f64>,
    /// Sample times (s)
    pub time: Array1<f64>,
    /// Basis signals, (points x entries)
    pub basis: Array2<Complex64>,
    /// Baseline design matrix, (points x coefficients)
    pub baseline: Array2<Complex64>,
    pub groups: MetabGroups,
    /// Observed spectrum
    pub data: Array1<Complex64>,
    /// Fitting window, half-open
    pub first: usize,
    pub last: usize,
    transform: SpectralTransform,
}

impl ModelContext {
    pub fn new(
        spectrum: &Spectrum,
        basis: &BasisSet,
        baseline: Array2<Complex64>,
        groups: MetabGroups,
        window: (usize, usize),
    ) -> Result<Self> {
        basis.check_compatible(spectrum)?;
        let n = spectrum.num_points();
        if baseline.nrows() != n {
            return Err(ModelError::InputMismatch(format!(
                "baseline has {} rows for {} spectral points",
                baseline.nrows(),
                n
            )));
        }
        if groups.len() != basis.num_basis() {
            return Err(ModelError::InputMismatch(format!(
                "{} group ids for {} basis entries",
                groups.len(),
                basis.num_basis()
            )));
        }
        let (first, last) = window;
        if first >= last || last > n {
            return Err(ModelError::InputMismatch(format!(
                "window [{}, {}) is not inside 0..{}",
                first, last, n
            )));
        }
        Ok(Self {
            frequency: spectrum.frequency_axis(),
            time: spectrum.time_axis(),
            basis: basis.fids().clone(),
            baseline,
            groups,
            data: spectrum.spectrum(),
            first,
            last,
            transform: SpectralTransform::new(n),
        })
    }

    pub fn num_points(&self) -> usize {
        self.time.len()
    }

    pub fn n_basis(&self) -> usize {
        self.basis.ncols()
    }

    pub fn n_groups(&self) -> usize {
        self.groups.num_groups()
    }

    pub fn n_baseline(&self) -> usize {
        self.baseline.ncols()
    }

    /// Number of spectral points inside the fitting window
    pub fn window_len(&self) -> usize {
        self.last - self.first
    }

    pub fn layout(&self, kind: ModelKind) -> ParamLayout {
        ParamLayout::new(kind, self.n_basis(), self.n_groups(), self.n_baseline())
    }

    pub fn transform(&self) -> &SpectralTransform {
        &self.transform
    }

    /// Windowed observed data
    pub fn windowed_data(&self) -> ndarray::ArrayView1<'_, Complex64> {
        self.data.slice(ndarray::s![self.first..self.last])
    }
}

/// Windowed complex residual `data - prediction`
pub fn residual(kind: ModelKind, x: &[f64], ctx: &ModelContext) -> Array1<Complex64> {
    let pred = (kind.functions().forward)(x, ctx);
    &ctx.data.slice(ndarray::s![ctx.first..ctx.last]) - &pred.slice(ndarray::s![ctx.first..ctx.last])
}
