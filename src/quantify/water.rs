/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Internal and water-referenced concentration scaling

use super::constants::QuantConstants;
use super::errors::{QuantError, Result};
use super::info::QuantificationInfo;
use crate::spectrum::{to_spectrum, Spectrum};
use crate::utils::trapz;
use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Trapezoidal area of the real part of the spectrum of `fid`
///
/// `axes` supplies the ppm axis when a window is given.
pub fn calculate_area(
    axes: &Spectrum,
    fid: &[Complex64],
    ppm_window: Option<(f64, f64)>,
) -> Result<f64> {
    let spec = to_spectrum(fid);
    let (first, last) = match ppm_window {
        Some(window) => axes.ppm_window_to_indices(window)?,
        None => (0, spec.len()),
    };
    let real: Vec<f64> = spec.iter().skip(first).take(last - first).map(|v| v.re).collect();
    Ok(trapz(&real))
}

/// Scaling that divides raw concentrations by the summed reference concentration
pub fn quantify_internal<S: AsRef<str>>(
    reference: &[S],
    concentrations: &[f64],
    names: &[String],
) -> Result<f64> {
    let mut total = 0.0;
    for r in reference {
        let r = r.as_ref();
        let idx = names
            .iter()
            .position(|n| n == r)
            .ok_or_else(|| QuantError::ReferenceNotFound(r.to_string()))?;
        total += concentrations[idx];
    }
    if total == 0.0 {
        let joined: Vec<&str> = reference.iter().map(|r| r.as_ref()).collect();
        return Err(QuantError::ZeroReference(joined.join("+")));
    }
    Ok(1.0 / total)
}

/// Intermediate values of the water scaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterScalingInfo {
    pub metabolite_area: f64,
    pub water_area: f64,
    /// Relaxation-corrected water concentration (mmol/l)
    pub water_concentration: f64,
    /// `1 / exp(-TE/T2_metab)`
    pub metabolite_relaxation_correction: f64,
    /// Scaling from the reference metabolite to every other metabolite
    pub internal: f64,
}

/// Molality and molarity scalings of raw concentrations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterScaling {
    pub molality: f64,
    pub molarity: f64,
    pub info: WaterScalingInfo,
}

/// Inputs of [`quantify_water`]
#[derive(Debug, Clone, Copy)]
pub struct WaterReference<'a> {
    /// Water reference FID
    pub water_fid: &'a [Complex64],
    /// Fitted FID of the reference metabolite alone
    pub reference_fid: &'a [Complex64],
    /// Reference metabolite name(s)
    pub reference: &'a [String],
    /// Protons of the reference metabolite inside `reference_window`
    pub reference_protons: f64,
    pub reference_window: Option<(f64, f64)>,
}

/// Water-referenced scalings from raw concentrations to mmol/kg and mmol/l
///
/// Compares the reference metabolite's fitted peak area with the water
/// area, corrects both for T2 decay, partial CSF volume and proton counts,
/// then moves from the reference metabolite to all metabolites through the
/// internal scaling.
pub fn quantify_water(
    axes: &Spectrum,
    input: &WaterReference<'_>,
    concentrations: &[f64],
    names: &[String],
    q: &QuantificationInfo,
    consts: &QuantConstants,
) -> Result<WaterScaling> {
    let metabolite_area = calculate_area(axes, input.reference_fid, input.reference_window)?;
    let water_area = calculate_area(axes, input.water_fid, None)?;
    if water_area == 0.0 || !water_area.is_finite() {
        return Err(QuantError::ZeroArea("water".to_string()));
    }

    let denom = water_area * (1.0 - q.fractions.csf) * q.r_metab;
    let protons = consts.h2o_protons / input.reference_protons;
    let molality = metabolite_area * q.water_relaxation() / denom * protons * consts.h2o_molality;
    let molarity =
        metabolite_area * q.water_relaxation_density() / denom * protons * consts.h2o_molality;

    let internal = quantify_internal(input.reference, concentrations, names)?;
    let info = WaterScalingInfo {
        metabolite_area,
        water_area,
        water_concentration: q.water_relaxation_density() * consts.h2o_molality,
        metabolite_relaxation_correction: 1.0 / q.r_metab,
        internal,
    };
    debug!(
        "Water scaling: metabolite area {:.3e}, water area {:.3e}, molality {:.3e}, molarity {:.3e}",
        metabolite_area,
        water_area,
        molality * internal,
        molarity * internal
    );
    Ok(WaterScaling {
        molality: molality * internal,
        molarity: molarity * internal,
        info,
    })
}
