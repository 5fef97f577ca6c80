/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Spectral data module
//!
//! Holds the observed time-domain signal together with its acquisition
//! parameters, the basis set used to model it, and the transforms between the
//! time and frequency domains. Frequency axes are built so that index order
//! matches increasing chemical shift, independent of how the data were
//! acquired.

pub mod basis;
mod errors;
pub mod transform;

pub use basis::{BasisHeader, BasisSet, MetabGroups};
pub use errors::{Result, SpectrumError};
pub use transform::{to_signal, to_spectrum, SpectralTransform};

use crate::utils::constants::{H1_PPM_RANGE, H2O_PPM_TO_TMS, P31_PPM_RANGE};
use crate::utils::math::nearest_index;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed nucleus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Nucleus {
    #[default]
    H1,
    P31,
    C13,
    Other(String),
}

impl Nucleus {
    /// Offset added to the frequency-derived ppm axis
    pub fn ppm_shift(&self) -> f64 {
        match self {
            Nucleus::H1 => H2O_PPM_TO_TMS,
            _ => 0.0,
        }
    }

    /// Default ppm sub-window with metabolite signal
    pub fn default_ppm_range(&self) -> Option<(f64, f64)> {
        match self {
            Nucleus::H1 => Some(H1_PPM_RANGE),
            Nucleus::P31 => Some(P31_PPM_RANGE),
            _ => None,
        }
    }
}

impl fmt::Display for Nucleus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nucleus::H1 => write!(f, "1H"),
            Nucleus::P31 => write!(f, "31P"),
            Nucleus::C13 => write!(f, "13C"),
            Nucleus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A single-voxel time-domain signal and its acquisition parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    fid: Array1<Complex64>,
    /// Sampling interval in seconds
    dwell_time: f64,
    /// Spectrometer frequency in MHz
    central_frequency: f64,
    nucleus: Nucleus,
}

impl Spectrum {
    /// Create a spectrum from its free-induction decay
    pub fn new(
        fid: Array1<Complex64>,
        dwell_time: f64,
        central_frequency: f64,
        nucleus: Nucleus,
    ) -> Result<Self> {
        if fid.is_empty() {
            return Err(SpectrumError::EmptySignal);
        }
        if !(dwell_time > 0.0) {
            return Err(SpectrumError::InvalidParameter(format!(
                "dwell time must be positive, got {}",
                dwell_time
            )));
        }
        if !(central_frequency > 0.0) {
            return Err(SpectrumError::InvalidParameter(format!(
                "central frequency must be positive, got {}",
                central_frequency
            )));
        }
        Ok(Self {
            fid,
            dwell_time,
            central_frequency,
            nucleus,
        })
    }

    /// Same acquisition parameters, different signal
    pub fn with_fid(&self, fid: Array1<Complex64>) -> Result<Self> {
        if fid.len() != self.fid.len() {
            return Err(SpectrumError::LengthMismatch {
                expected: self.fid.len(),
                found: fid.len(),
            });
        }
        Self::new(fid, self.dwell_time, self.central_frequency, self.nucleus.clone())
    }

    pub fn fid(&self) -> &Array1<Complex64> {
        &self.fid
    }

    pub fn dwell_time(&self) -> f64 {
        self.dwell_time
    }

    pub fn central_frequency(&self) -> f64 {
        self.central_frequency
    }

    pub fn nucleus(&self) -> &Nucleus {
        &self.nucleus
    }

    pub fn num_points(&self) -> usize {
        self.fid.len()
    }

    /// Spectral width in Hz
    pub fn bandwidth(&self) -> f64 {
        1.0 / self.dwell_time
    }

    /// Sample times in seconds, starting at zero
    pub fn time_axis(&self) -> Array1<f64> {
        Array1::from_iter((0..self.num_points()).map(|n| n as f64 * self.dwell_time))
    }

    /// Frequency of each spectral bin in Hz, matching the centred transform
    pub fn frequency_axis(&self) -> Array1<f64> {
        let n = self.num_points();
        let df = self.bandwidth() / n as f64;
        let centre = (n / 2) as f64;
        Array1::from_iter((0..n).map(|k| (k as f64 - centre) * df))
    }

    /// Chemical shift of each spectral bin in ppm (increasing with index)
    pub fn ppm_axis(&self) -> Array1<f64> {
        let shift = self.nucleus.ppm_shift();
        self.frequency_axis()
            .mapv(|f| f / self.central_frequency + shift)
    }

    /// Centred frequency-domain spectrum
    pub fn spectrum(&self) -> Array1<Complex64> {
        to_spectrum(&self.fid.to_vec())
    }

    /// Map a closed ppm interval onto a half-open index range `[first, last)`
    ///
    /// The endpoints may be given in either order. Fails with
    /// [`SpectrumError::InvalidRange`] when the interval does not overlap the
    /// sampled bandwidth or is narrower than a single bin.
    pub fn ppm_window_to_indices(&self, window: (f64, f64)) -> Result<(usize, usize)> {
        let axis = self.ppm_axis().to_vec();
        ppm_window_to_indices(&axis, window)
    }

    /// Index range for an optional window, the full axis when `None`
    pub fn ppmlim_to_range(&self, window: Option<(f64, f64)>) -> Result<(usize, usize)> {
        match window {
            Some(w) => self.ppm_window_to_indices(w),
            None => Ok((0, self.num_points())),
        }
    }
}

/// Map a closed ppm interval onto a half-open index range of `axis`
pub fn ppm_window_to_indices(axis: &[f64], window: (f64, f64)) -> Result<(usize, usize)> {
    let (low, high) = if window.0 <= window.1 {
        window
    } else {
        (window.1, window.0)
    };
    let min = axis.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = axis.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let invalid = SpectrumError::InvalidRange {
        low,
        high,
        min,
        max,
    };

    if axis.is_empty() || high < min || low > max {
        return Err(invalid);
    }

    let a = nearest_index(axis, low).ok_or_else(|| invalid.clone())?;
    let b = nearest_index(axis, high).ok_or_else(|| invalid.clone())?;
    let (first, last) = if a <= b { (a, b) } else { (b, a) };
    if first == last {
        return Err(invalid);
    }
    Ok((first, last))
}
