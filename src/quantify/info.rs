/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Sequence and tissue information for water referencing

use super::constants::QuantConstants;
use super::errors::{QuantError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// T2 relaxation times in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct T2Values {
    pub h2o_gm: f64,
    pub h2o_wm: f64,
    pub h2o_csf: f64,
    pub metab: f64,
}

impl T2Values {
    /// Read from a dictionary keyed by `H2O_GM`, `H2O_WM`, `H2O_CSF` and `METAB`
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self> {
        let get = |key: &str| {
            map.get(key)
                .copied()
                .ok_or_else(|| QuantError::MissingT2Value(key.to_string()))
        };
        Ok(Self {
            h2o_gm: get("H2O_GM")?,
            h2o_wm: get("H2O_WM")?,
            h2o_csf: get("H2O_CSF")?,
            metab: get("METAB")?,
        })
    }
}

/// Tissue volume fractions of the voxel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TissueFractions {
    pub gm: f64,
    pub wm: f64,
    pub csf: f64,
}

impl TissueFractions {
    /// Each fraction must lie in [0, 1] and the voxel must hold some non-CSF
    /// tissue. The sum is not checked, segmentation output is often rounded.
    pub fn new(gm: f64, wm: f64, csf: f64) -> Result<Self> {
        for (name, v) in [("GM", gm), ("WM", wm), ("CSF", csf)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(QuantError::InvalidTissueFractions(format!(
                    "{} fraction {} is outside [0, 1]",
                    name, v
                )));
            }
        }
        if csf >= 1.0 {
            return Err(QuantError::InvalidTissueFractions(
                "voxel is entirely CSF".to_string(),
            ));
        }
        Ok(Self { gm, wm, csf })
    }
}

/// Tissue water densities in g/ml
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TissueDensities {
    pub gm: f64,
    pub wm: f64,
    pub csf: f64,
}

/// Everything water referencing needs besides the spectra
///
/// The T2 decay factors `exp(-TE/T2)` are computed once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantificationInfo {
    /// Echo time (s)
    pub te: f64,
    pub t2: T2Values,
    pub fractions: TissueFractions,
    pub densities: TissueDensities,
    pub r_h2o_gm: f64,
    pub r_h2o_wm: f64,
    pub r_h2o_csf: f64,
    pub r_metab: f64,
}

impl QuantificationInfo {
    /// Densities default to the constant table when `None`
    pub fn new(
        te: f64,
        t2: T2Values,
        fractions: TissueFractions,
        densities: Option<TissueDensities>,
        consts: &QuantConstants,
    ) -> Self {
        let decay = |t2: f64| (-te / t2).exp();
        Self {
            te,
            t2,
            fractions,
            densities: densities.unwrap_or(consts.tissue_water_density),
            r_h2o_gm: decay(t2.h2o_gm),
            r_h2o_wm: decay(t2.h2o_wm),
            r_h2o_csf: decay(t2.h2o_csf),
            r_metab: decay(t2.metab),
        }
    }

    /// Fraction-weighted water relaxation term
    pub fn water_relaxation(&self) -> f64 {
        let f = &self.fractions;
        f.gm * self.r_h2o_gm + f.wm * self.r_h2o_wm + f.csf * self.r_h2o_csf
    }

    /// Fraction and density weighted water relaxation term
    pub fn water_relaxation_density(&self) -> f64 {
        let f = &self.fractions;
        let d = &self.densities;
        f.gm * d.gm * self.r_h2o_gm + f.wm * d.wm * self.r_h2o_wm + f.csf * d.csf * self.r_h2o_csf
    }
}

/// T2 preset for the field strength implied by `central_frequency` (MHz)
///
/// Only fields within 0.5 T of 3 T or 7 T have a preset.
pub fn select_t2_values(central_frequency: f64, consts: &QuantConstants) -> Result<T2Values> {
    let field = central_frequency / consts.h1_gamma;
    if field > 6.5 && field < 7.5 {
        Ok(consts.t2_7t)
    } else if field > 2.5 && field < 3.5 {
        Ok(consts.t2_3t)
    } else {
        Err(QuantError::UnsupportedFieldStrength(field))
    }
}

/// Quantification info using the stored T2 preset for the field strength
pub fn load_default_quantification_info(
    te: f64,
    fractions: TissueFractions,
    central_frequency: f64,
    consts: &QuantConstants,
) -> Result<QuantificationInfo> {
    let t2 = select_t2_values(central_frequency, consts)?;
    debug!(
        "Using stored T2 values for {:.1}T: {:?}",
        central_frequency / consts.h1_gamma,
        t2
    );
    Ok(QuantificationInfo::new(te, t2, fractions, None, consts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantify::QUANT_CONSTANTS;
    use approx::assert_relative_eq;

    #[test]
    fn test_t2_from_map() {
        let mut map: HashMap<String, f64> = [("H2O_GM", 0.11), ("H2O_WM", 0.08), ("H2O_CSF", 2.55)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        assert_eq!(
            T2Values::from_map(&map),
            Err(QuantError::MissingT2Value("METAB".to_string()))
        );
        map.insert("METAB".to_string(), 0.16);
        let t2 = T2Values::from_map(&map).unwrap();
        assert_eq!(t2.metab, 0.16);
    }

    #[test]
    fn test_fraction_validation() {
        assert!(TissueFractions::new(0.6, 0.4, 0.0).is_ok());
        assert!(TissueFractions::new(0.334, 0.333, 0.334).is_ok());
        assert!(TissueFractions::new(1.2, 0.4, 0.0).is_err());
        assert!(TissueFractions::new(-0.1, 0.4, 0.0).is_err());
        assert!(TissueFractions::new(0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_relaxation_factors() {
        let consts = &*QUANT_CONSTANTS;
        let fr = TissueFractions::new(0.6, 0.4, 0.0).unwrap();
        let q = QuantificationInfo::new(0.03, consts.t2_3t, fr, None, consts);
        assert_relative_eq!(q.r_h2o_gm, (-0.03f64 / 0.110).exp(), epsilon = 1e-12);
        assert_relative_eq!(q.r_metab, (-0.03f64 / 0.271).exp(), epsilon = 1e-12);
        assert_eq!(q.densities.gm, 0.78);
        assert_relative_eq!(
            q.water_relaxation_density(),
            0.6 * 0.78 * q.r_h2o_gm + 0.4 * 0.65 * q.r_h2o_wm,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_select_t2_by_field() {
        let consts = &*QUANT_CONSTANTS;
        assert_eq!(select_t2_values(123.2, consts).unwrap(), consts.t2_3t);
        assert_eq!(select_t2_values(297.2, consts).unwrap(), consts.t2_7t);
        assert!(matches!(
            select_t2_values(63.9, consts),
            Err(QuantError::UnsupportedFieldStrength(f)) if (f - 1.5).abs() < 0.01
        ));
        assert!(select_t2_values(150.0, consts).is_err());
    }
}
