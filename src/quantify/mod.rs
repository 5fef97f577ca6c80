/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Quantification of fitted concentrations
//!
//! Converts raw fit coefficients to ratios against an internal reference
//! metabolite, or to molality and molarity using an unsuppressed water
//! reference acquisition together with tissue fractions and T2 relaxation.

pub mod constants;
mod errors;
pub mod info;
pub mod water;

pub use constants::{QuantConstants, QUANT_CONSTANTS};
pub use errors::{QuantError, Result};
pub use info::{
    load_default_quantification_info, select_t2_values, QuantificationInfo, T2Values,
    TissueDensities, TissueFractions,
};
pub use water::{
    calculate_area, quantify_internal, quantify_water, WaterReference, WaterScaling,
    WaterScalingInfo,
};
