/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Small numerical helpers shared by the spectral and quantification code

#![allow(clippy::needless_range_loop)]

use super::errors::{Result, UtilsError};
use num_complex::Complex64;

/// Evenly spaced samples over a closed interval (both ends included)
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Trapezoidal integral of uniformly spaced samples with unit spacing
pub fn trapz(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let interior: f64 = values[1..values.len() - 1].iter().sum();
    interior + 0.5 * (values[0] + values[values.len() - 1])
}

/// Remove from `x` its projection onto the span of `columns`
///
/// The columns must already be mutually orthogonal, which holds when they were
/// produced by repeated calls to this function (classic Gram-Schmidt).
pub fn project_out(x: &[Complex64], columns: &[Vec<Complex64>]) -> Result<Vec<Complex64>> {
    let mut out = x.to_vec();
    for col in columns {
        if col.len() != x.len() {
            return Err(UtilsError::DimensionMismatch(format!(
                "column of length {} cannot be projected out of a vector of length {}",
                col.len(),
                x.len()
            )));
        }
        let norm_sq: f64 = col.iter().map(|c| c.norm_sqr()).sum();
        if norm_sq < f64::EPSILON {
            continue;
        }
        // <col, out> with conjugation on the column
        let mut dot = Complex64::new(0.0, 0.0);
        for i in 0..out.len() {
            dot += col[i].conj() * out[i];
        }
        let coeff = dot / norm_sq;
        for i in 0..out.len() {
            out[i] -= coeff * col[i];
        }
    }
    Ok(out)
}

/// Index of the element closest to `target`
pub fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    axis.iter()
        .enumerate()
        .min_by(|a, b| {
            (a.1 - target)
                .abs()
                .partial_cmp(&(b.1 - target).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Arithmetic mean, zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation (n - 1 denominator), zero for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Median of a slice (average of the two central values for even lengths)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert_relative_eq!(v[0], -1.0);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-15);
        assert_relative_eq!(v[4], 1.0);
    }

    #[test]
    fn test_trapz_matches_closed_form() {
        // Integral of x over 0..4 sampled at unit spacing
        let v = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(trapz(&v), 8.0);
        assert_eq!(trapz(&[3.0]), 0.0);
    }

    #[test]
    fn test_project_out_orthogonalises() {
        let ones = vec![Complex64::new(1.0, 0.0); 4];
        let ramp: Vec<Complex64> = (0..4).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let resid = project_out(&ramp, &[ones.clone()]).unwrap();
        let dot: Complex64 = resid.iter().zip(&ones).map(|(a, b)| a * b.conj()).sum();
        assert!(dot.norm() < 1e-12);
        assert_relative_eq!(resid[0].re, -1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_summary_statistics() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&v), 2.5);
        assert_relative_eq!(median(&v), 2.5);
        assert_relative_eq!(std_dev(&v), (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(nearest_index(&v, 2.9), Some(2));
    }
}
