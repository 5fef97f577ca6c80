/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Physical and tissue constants used by water referencing

use super::info::{T2Values, TissueDensities};
use crate::utils::constants::H1_GAMMA;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Read-only table of quantification constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantConstants {
    /// Molality of pure water (mmol/kg)
    pub h2o_molality: f64,
    /// Protons contributing to the water resonance
    pub h2o_protons: f64,
    /// Tissue water densities (g/ml)
    pub tissue_water_density: TissueDensities,
    /// 1H gyromagnetic ratio (MHz/T)
    pub h1_gamma: f64,
    pub t2_3t: T2Values,
    pub t2_7t: T2Values,
}

impl QuantConstants {
    pub fn standard() -> Self {
        Self {
            h2o_molality: 55.51e3,
            h2o_protons: 2.0,
            tissue_water_density: TissueDensities {
                gm: 0.78,
                wm: 0.65,
                csf: 0.97,
            },
            h1_gamma: H1_GAMMA,
            t2_3t: T2Values {
                h2o_gm: 0.110,
                h2o_wm: 0.080,
                h2o_csf: 2.55,
                metab: 0.271,
            },
            t2_7t: T2Values {
                h2o_gm: 0.050,
                h2o_wm: 0.055,
                h2o_csf: 1.050,
                metab: 0.160,
            },
        }
    }
}

impl Default for QuantConstants {
    fn default() -> Self {
        Self::standard()
    }
}

/// The standard table, built on first use
pub static QUANT_CONSTANTS: Lazy<QuantConstants> = Lazy::new(QuantConstants::standard);
