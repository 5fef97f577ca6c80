/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Time-domain / frequency-domain conversions
//!
//! The forward transform is the unitary DFT followed by a centring shift, so
//! index `N/2` of a spectrum holds 0 Hz and frequency increases with index.
//! The inverse undoes the shift before the unitary inverse DFT, which makes
//! the pair lossless up to floating-point rounding.

use super::errors::{Result, SpectrumError};
use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Planned forward and inverse transforms for one signal length
#[derive(Clone)]
pub struct SpectralTransform {
    n: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scale: f64,
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform").field("n", &self.n).finish()
    }
}

impl SpectralTransform {
    /// Plan transforms for signals of `n` points
    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        let scale = if n > 0 { 1.0 / (n as f64).sqrt() } else { 1.0 };
        Self {
            n,
            forward,
            inverse,
            scale,
        }
    }

    /// Number of points the transforms were planned for
    pub fn len(&self) -> usize {
        self.n
    }

    /// True when planned for empty signals
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn check_len(&self, found: usize) -> Result<()> {
        if found != self.n {
            return Err(SpectrumError::LengthMismatch {
                expected: self.n,
                found,
            });
        }
        Ok(())
    }

    /// Transform a time-domain buffer into a centred spectrum in place
    pub(crate) fn spectrum_in_place(&self, buffer: &mut [Complex64]) {
        if buffer.is_empty() {
            return;
        }
        self.forward.process(buffer);
        buffer.iter_mut().for_each(|v| *v *= self.scale);
        buffer.rotate_right(self.n / 2);
    }

    /// Transform a centred spectrum back into the time domain in place
    pub(crate) fn signal_in_place(&self, buffer: &mut [Complex64]) {
        if buffer.is_empty() {
            return;
        }
        buffer.rotate_left(self.n / 2);
        self.inverse.process(buffer);
        buffer.iter_mut().for_each(|v| *v *= self.scale);
    }

    /// Time-domain signal to spectrum
    pub fn to_spectrum(&self, fid: &[Complex64]) -> Result<Array1<Complex64>> {
        self.check_len(fid.len())?;
        let mut buffer = fid.to_vec();
        self.spectrum_in_place(&mut buffer);
        Ok(Array1::from(buffer))
    }

    /// Spectrum to time-domain signal
    pub fn to_signal(&self, spec: &[Complex64]) -> Result<Array1<Complex64>> {
        self.check_len(spec.len())?;
        let mut buffer = spec.to_vec();
        self.signal_in_place(&mut buffer);
        Ok(Array1::from(buffer))
    }

    /// Transform every column of a (points x entries) matrix
    pub fn columns_to_spectrum(&self, fids: &Array2<Complex64>) -> Result<Array2<Complex64>> {
        self.check_len(fids.nrows())?;
        let mut out = fids.clone();
        let mut buffer = vec![Complex64::new(0.0, 0.0); self.n];
        for mut column in out.axis_iter_mut(Axis(1)) {
            for (b, v) in buffer.iter_mut().zip(column.iter()) {
                *b = *v;
            }
            self.spectrum_in_place(&mut buffer);
            for (v, b) in column.iter_mut().zip(buffer.iter()) {
                *v = *b;
            }
        }
        Ok(out)
    }
}

/// Time-domain signal to centred spectrum
pub fn to_spectrum(fid: &[Complex64]) -> Array1<Complex64> {
    let transform = SpectralTransform::new(fid.len());
    let mut buffer = fid.to_vec();
    transform.spectrum_in_place(&mut buffer);
    Array1::from(buffer)
}

/// Centred spectrum to time-domain signal
pub fn to_signal(spec: &[Complex64]) -> Array1<Complex64> {
    let transform = SpectralTransform::new(spec.len());
    let mut buffer = spec.to_vec();
    transform.signal_in_place(&mut buffer);
    Array1::from(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip_even_and_odd() {
        for n in [8usize, 9, 64] {
            let fid: Vec<Complex64> = (0..n)
                .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 1.3).cos() - 0.2))
                .collect();
            let back = to_signal(to_spectrum(&fid).as_slice().unwrap());
            for (a, b) in fid.iter().zip(back.iter()) {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_dc_lands_in_centre_bin() {
        let n = 16;
        let fid = vec![Complex64::new(1.0, 0.0); n];
        let spec = to_spectrum(&fid);
        let peak = spec
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, n / 2);
        // Unitary scaling preserves energy
        assert_relative_eq!(spec[n / 2].re, (n as f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_positive_frequency_maps_above_centre() {
        let n = 32;
        let fid: Vec<Complex64> = (0..n)
            .map(|k| Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * 3.0 * k as f64 / n as f64))
            .collect();
        let spec = to_spectrum(&fid);
        assert!(spec[n / 2 + 3].norm() > 5.0);
    }

    #[test]
    fn test_columns_match_single_transforms() {
        let n = 16;
        let t = SpectralTransform::new(n);
        let fids = Array2::from_shape_fn((n, 2), |(i, j)| {
            Complex64::from_polar(1.0 + j as f64, 0.3 * i as f64 * (j + 1) as f64)
        });
        let specs = t.columns_to_spectrum(&fids).unwrap();
        for j in 0..2 {
            let single = t.to_spectrum(&fids.column(j).to_vec()).unwrap();
            for (a, b) in specs.column(j).iter().zip(single.iter()) {
                assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_length_is_checked() {
        let t = SpectralTransform::new(4);
        let err = t.to_spectrum(&[Complex64::new(0.0, 0.0); 3]).unwrap_err();
        assert_eq!(err, SpectrumError::LengthMismatch { expected: 4, found: 3 });
    }
}
