/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Concentration scalings

use crate::quantify::{QuantConstants, QuantificationInfo, WaterScalingInfo};
use crate::spectrum::Spectrum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit in which concentrations are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Fit coefficients as they are
    #[default]
    Raw,
    /// Ratio to the internal reference metabolite(s)
    Internal,
    /// mmol per kg tissue water
    Molality,
    /// mmol per litre
    Molarity,
}

impl fmt::Display for Scaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scaling::Raw => "raw",
            Scaling::Internal => "internal",
            Scaling::Molality => "molality",
            Scaling::Molarity => "molarity",
        };
        write!(f, "{}", s)
    }
}

/// Scaling factors derived from a fit, applied by multiplication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcScalings {
    pub internal: f64,
    pub internal_reference: Vec<String>,
    /// Present only when a water reference was supplied
    pub molality: Option<f64>,
    pub molarity: Option<f64>,
    pub info: Option<WaterScalingInfo>,
}

/// Water reference inputs for [`ScalingRequest`]
#[derive(Debug, Clone)]
pub struct WaterScalingRequest<'a> {
    /// Unsuppressed water acquisition
    pub water: &'a Spectrum,
    pub info: &'a QuantificationInfo,
    /// Metabolite(s) whose fitted peak is compared with water
    pub reference: Vec<String>,
    /// Protons contributing to the reference peak inside `reference_window`
    pub reference_protons: f64,
    pub reference_window: Option<(f64, f64)>,
    pub consts: &'a QuantConstants,
}

/// What to compute in `FitResult::calculate_scalings`
#[derive(Debug, Clone)]
pub struct ScalingRequest<'a> {
    pub internal_reference: Vec<String>,
    pub water: Option<WaterScalingRequest<'a>>,
}

impl<'a> ScalingRequest<'a> {
    /// Internal referencing only
    pub fn internal<S: AsRef<str>>(reference: &[S]) -> Self {
        Self {
            internal_reference: reference.iter().map(|s| s.as_ref().to_string()).collect(),
            water: None,
        }
    }

    pub fn with_water(mut self, water: WaterScalingRequest<'a>) -> Self {
        self.water = Some(water);
        self
    }
}
