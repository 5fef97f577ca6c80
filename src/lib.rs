/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! # mrsfit-rs
//!
//! Nonlinear spectral fitting and water-referenced quantification for
//! magnetic resonance spectroscopy.
//!
//! An observed free-induction decay is modelled as a linear combination of
//! basis signals, each broadened, shifted and phased, plus a polynomial
//! baseline. Parameters are estimated either by bounded least squares or by
//! Metropolis-Hastings sampling, and the fitted concentrations can be
//! scaled to an internal reference or to molal and molar units.

pub mod fitting;
pub mod model;
pub mod quantify;
pub mod results;
pub mod spectrum;
pub mod utils;

pub use fitting::{fit_many, fit_many_strict, fit_model, FitConfig, FitMethod};
pub use model::ModelKind;
pub use results::{FitResult, Scaling};
pub use spectrum::{BasisSet, Spectrum};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Fits spectra with one fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Fitter {
    config: FitConfig,
}

impl Fitter {
    /// Create a fitter with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit one spectrum
    pub fn run(&self, spectrum: &Spectrum, basis: &BasisSet) -> anyhow::Result<FitResult> {
        Ok(fit_model(spectrum, basis, &self.config)?)
    }

    /// Fit several spectra in parallel
    pub fn run_many(&self, spectra: &[Spectrum], basis: &BasisSet) -> anyhow::Result<Vec<FitResult>> {
        fit_many_strict(spectra, basis, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitter_creation() {
        let fitter = Fitter::new();
        assert_eq!(fitter.config().method, FitMethod::Newton);
        assert_eq!(fitter.config().model, ModelKind::Lorentzian);
        assert!(!VERSION.is_empty());
    }
}
