/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Per-metabolite summaries and the JSON report

use crate::fitting::{FitMethod, OptimizerReport};
use crate::model::ModelKind;
use crate::utils::math::{mean, median, std_dev};
use serde::{Deserialize, Serialize};

/// Central value and spread of one concentration
///
/// `std` is `None` when the spread is undefined, for example when the
/// Fisher information is singular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaboliteSummary {
    pub name: String,
    pub mean: f64,
    pub std: Option<f64>,
    pub median: f64,
}

/// Keeps finite values, JSON has no representation for NaN or infinity
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl MetaboliteSummary {
    pub(crate) fn from_chain(name: String, chain: &[f64]) -> Self {
        Self {
            name,
            mean: mean(chain),
            std: finite(std_dev(chain)),
            median: median(chain),
        }
    }

    pub(crate) fn from_point(name: String, value: f64, std: f64) -> Self {
        Self {
            name,
            mean: value,
            std: finite(std),
            median: value,
        }
    }
}

/// Serialisable overview of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub model: ModelKind,
    pub method: FitMethod,
    pub metabolites: Vec<MetaboliteSummary>,
    /// Percentage standard deviation per metabolite, `None` where it is
    /// unbounded (zero concentration) or undefined
    pub perc_sd: Vec<Option<f64>>,
    pub mse: f64,
    pub params: Vec<f64>,
    pub report: Option<OptimizerReport>,
    pub acceptance_rate: Option<Vec<f64>>,
}
