/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Polynomial baseline regressors
//!
//! The baseline is a complex polynomial over a normalised axis that spans
//! only the fitting window. Each real regressor of order `i > 0` has its
//! projection onto all lower-order regressors removed before it is added
//! together with its imaginary counterpart, so the design matrix columns come
//! in (real, imaginary) pairs.

use crate::utils::math::{linspace, project_out};
use crate::utils::Result;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Baseline order as used inside the fit
///
/// A negative requested order disables the baseline. The regressors of order
/// zero are still generated so the parameter layout is unchanged, but their
/// coefficients are pinned to zero by the optimiser bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSpec {
    pub order: usize,
    pub disabled: bool,
}

impl BaselineSpec {
    pub fn from_order(order: i32) -> Self {
        if order < 0 {
            Self {
                order: 0,
                disabled: true,
            }
        } else {
            Self {
                order: order as usize,
                disabled: false,
            }
        }
    }

    /// Number of baseline coefficients (real and imaginary per order)
    pub fn num_coefficients(&self) -> usize {
        2 * (self.order + 1)
    }
}

/// Build the (points x 2(order+1)) baseline design matrix
///
/// Rows outside `[first, last)` are zero.
pub fn prepare_baseline_regressor(
    n_points: usize,
    first: usize,
    last: usize,
    order: usize,
) -> Result<Array2<Complex64>> {
    let mut axis = vec![Complex64::new(0.0, 0.0); n_points];
    let last = last.min(n_points);
    let first = first.min(last);
    for (x, v) in axis[first..last]
        .iter_mut()
        .zip(linspace(-1.0, 1.0, last - first))
    {
        *x = Complex64::new(v, 0.0);
    }

    let mut regressors: Vec<Vec<Complex64>> = Vec::with_capacity(order + 1);
    let mut design = Array2::<Complex64>::zeros((n_points, 2 * (order + 1)));
    let i_unit = Complex64::new(0.0, 1.0);

    for i in 0..=order {
        let mut regressor: Vec<Complex64> = axis.iter().map(|x| x.powu(i as u32)).collect();
        if i > 0 {
            // Columns were built by this same loop, so they are mutually orthogonal
            regressor = project_out(&regressor, &regressors)?;
        }
        for (t, r) in regressor.iter().enumerate() {
            design[(t, 2 * i)] = *r;
            design[(t, 2 * i + 1)] = i_unit * r;
        }
        regressors.push(regressor);
    }

    for t in (0..first).chain(last..n_points) {
        for c in 0..design.ncols() {
            design[(t, c)] = Complex64::new(0.0, 0.0);
        }
    }
    Ok(design)
}
