/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Fit configuration

use super::errors::FittingError;
use crate::model::ModelKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the model parameters are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Bounded gradient-based least squares
    #[default]
    Newton,
    /// Metropolis-Hastings sampling seeded from the `Newton` solution
    Mh,
    /// Return the initialiser's estimate without refinement
    Init,
}

impl FromStr for FitMethod {
    type Err = FittingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newton" | "deterministic" => Ok(FitMethod::Newton),
            "mh" | "mcmc" | "stochastic" => Ok(FitMethod::Mh),
            "init" | "initializer" | "initialiser" => Ok(FitMethod::Init),
            _ => Err(FittingError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMethod::Newton => write!(f, "Newton"),
            FitMethod::Mh => write!(f, "MH"),
            FitMethod::Init => write!(f, "init"),
        }
    }
}

/// Everything needed to run one fit, fixed before fitting starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Fitting window in ppm, the whole spectrum when `None`
    pub ppm_window: Option<(f64, f64)>,
    /// Polynomial baseline order, negative disables the baseline
    pub baseline_order: i32,
    /// Group id per basis entry, all entries in group 0 when `None`
    pub metab_groups: Option<Vec<usize>>,
    pub model: ModelKind,
    pub method: FitMethod,
    /// Post burn-in samples returned by the sampler
    pub mh_samples: usize,
    /// Discarded sampler jumps
    pub mh_burnin: usize,
    /// Seed of the sampler's random source
    pub seed: u64,
    /// Starting point, replaces the initialiser when given
    pub x0: Option<Vec<f64>>,
    /// Iteration cap of the deterministic optimiser
    pub max_iterations: usize,
    /// Relative loss decrease below which the deterministic optimiser stops
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            ppm_window: Some((0.2, 4.2)),
            baseline_order: 2,
            metab_groups: None,
            model: ModelKind::Lorentzian,
            method: FitMethod::Newton,
            mh_samples: 500,
            mh_burnin: 100,
            seed: 0,
            x0: None,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

impl FitConfig {
    /// Reject settings no fit can run with
    pub fn validate(&self) -> Result<(), FittingError> {
        if self.method == FitMethod::Mh && self.mh_samples == 0 {
            return Err(FittingError::InvalidConfig(
                "sampling needs at least one kept sample".to_string(),
            ));
        }
        if !(self.tolerance >= 0.0) {
            return Err(FittingError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    pub fn with_method(mut self, method: FitMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_window(mut self, window: (f64, f64)) -> Self {
        self.ppm_window = Some(window);
        self
    }

    pub fn with_baseline_order(mut self, order: i32) -> Self {
        self.baseline_order = order;
        self
    }

    pub fn with_groups(mut self, groups: Vec<usize>) -> Self {
        self.metab_groups = Some(groups);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_aliases() {
        assert_eq!("Newton".parse::<FitMethod>().unwrap(), FitMethod::Newton);
        assert_eq!("MH".parse::<FitMethod>().unwrap(), FitMethod::Mh);
        assert_eq!("init".parse::<FitMethod>().unwrap(), FitMethod::Init);
        assert!(matches!(
            "simplex".parse::<FitMethod>(),
            Err(FittingError::UnknownMethod(m)) if m == "simplex"
        ));
    }

    #[test]
    fn test_validation() {
        assert!(FitConfig::default().validate().is_ok());
        let mut cfg = FitConfig::default().with_method(FitMethod::Mh);
        cfg.mh_samples = 0;
        assert!(matches!(cfg.validate(), Err(FittingError::InvalidConfig(_))));
        let mut cfg = FitConfig::default();
        cfg.tolerance = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = FitConfig::default()
            .with_method(FitMethod::Mh)
            .with_model(ModelKind::Voigt)
            .with_baseline_order(-1);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: FitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        // Missing fields fall back to defaults
        let partial: FitConfig = serde_json::from_str(r#"{"method": "mh"}"#).unwrap();
        assert_eq!(partial.method, FitMethod::Mh);
        assert_eq!(partial.mh_samples, 500);
    }
}
