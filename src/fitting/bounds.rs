/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Box constraints and sampling masks over the parameter layout

use crate::model::ParamLayout;

/// Finite stand-in for an unbounded limit in the sampler
const SAMPLER_MAX: f64 = 1e10;
const SAMPLER_MIN: f64 = -1e10;

/// Which flavour of limits to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundStyle {
    /// Infinite limits where a parameter is unconstrained
    Box,
    /// Large finite limits, as used by the sampler
    Sampler,
}

/// Per-parameter lower and upper limits
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// True when the parameter cannot move
    pub fn is_pinned(&self, i: usize) -> bool {
        self.lower[i] == self.upper[i]
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(v, (l, u))| v >= l && v <= u)
    }

    /// Move every entry onto its nearest admissible value, returning how many moved
    pub fn clamp(&self, x: &mut [f64]) -> usize {
        let mut moved = 0;
        for (v, (l, u)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            let c = v.max(*l).min(*u);
            if c != *v {
                moved += 1;
            }
            *v = c;
        }
        moved
    }
}

/// Limits for every parameter of `layout`
///
/// Concentrations and broadening terms are non-negative, shifts, phases and
/// baseline coefficients are free. A disabled baseline pins its
/// coefficients to exactly zero.
pub fn get_bounds(layout: &ParamLayout, disable_baseline: bool, style: BoundStyle) -> Bounds {
    let (min, max) = match style {
        BoundStyle::Box => (f64::NEG_INFINITY, f64::INFINITY),
        BoundStyle::Sampler => (SAMPLER_MIN, SAMPLER_MAX),
    };
    let n = layout.len();
    let mut lower = vec![min; n];
    let mut upper = vec![max; n];

    for i in layout.conc() {
        lower[i] = 0.0;
    }
    for k in 0..layout.kind.num_broadening() {
        for i in layout.broadening(k) {
            lower[i] = 0.0;
        }
    }
    if disable_baseline {
        for i in layout.baseline() {
            lower[i] = 0.0;
            upper[i] = 0.0;
        }
    }
    Bounds { lower, upper }
}

/// Parameter blocks that the sampler is allowed to move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitMask {
    pub fit_conc: bool,
    pub fit_shape: bool,
    pub fit_phase: bool,
    pub fit_baseline: bool,
}

impl Default for FitMask {
    fn default() -> Self {
        Self {
            fit_conc: true,
            fit_shape: true,
            fit_phase: true,
            fit_baseline: false,
        }
    }
}

/// Boolean mask over the layout selecting the sampled dimensions
pub fn get_fitting_mask(layout: &ParamLayout, mask: FitMask) -> Vec<bool> {
    let mut out = vec![false; layout.len()];
    for i in layout.conc() {
        out[i] = mask.fit_conc;
    }
    for i in layout.conc().end..layout.phi0() {
        out[i] = mask.fit_shape;
    }
    out[layout.phi0()] = mask.fit_phase;
    out[layout.phi1()] = mask.fit_phase;
    for i in layout.baseline() {
        out[i] = mask.fit_baseline;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    #[test]
    fn test_box_bounds() {
        let layout = ParamLayout::new(ModelKind::Voigt, 2, 1, 2);
        let b = get_bounds(&layout, false, BoundStyle::Box);
        assert_eq!(&b.lower[..4], &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(b.lower[layout.eps().start], f64::NEG_INFINITY);
        assert!(b.upper.iter().all(|u| u.is_infinite()));
    }

    #[test]
    fn test_disabled_baseline_is_pinned() {
        let layout = ParamLayout::new(ModelKind::Lorentzian, 2, 1, 2);
        let b = get_bounds(&layout, true, BoundStyle::Sampler);
        for i in layout.baseline() {
            assert!(b.is_pinned(i));
            assert_eq!(b.upper[i], 0.0);
        }
        assert_eq!(b.upper[0], 1e10);
    }

    #[test]
    fn test_clamp_counts_moves() {
        let layout = ParamLayout::new(ModelKind::Lorentzian, 1, 1, 2);
        let b = get_bounds(&layout, true, BoundStyle::Box);
        let mut x = vec![-1.0, 2.0, 0.5, 0.0, 0.0, 0.3, 0.0];
        assert_eq!(b.clamp(&mut x), 2);
        assert_eq!(x[0], 0.0);
        assert_eq!(x[5], 0.0);
        assert!(b.contains(&x));
    }

    #[test]
    fn test_default_mask_excludes_baseline() {
        let layout = ParamLayout::new(ModelKind::Lorentzian, 2, 1, 4);
        let mask = get_fitting_mask(&layout, FitMask::default());
        assert_eq!(mask.iter().filter(|m| **m).count(), 2 + 2 + 2);
        assert!(layout.baseline().all(|i| !mask[i]));
    }
}
