/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Voigt line-shape model
//!
//! Each group decays its basis signals by
//! `exp(-(i eps + gamma + sigma^2 t) t)`, combining a Lorentzian width
//! `gamma` and a Gaussian width `sigma`.

use super::engine::{self, LineShape};
use super::{ModelContext, ModelFunctions, ModelKind, ModelParams};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

pub(crate) struct Voigt;

impl LineShape for Voigt {
    const KIND: ModelKind = ModelKind::Voigt;

    fn decay(t: f64, b: &[f64], eps: f64) -> Complex64 {
        let (gamma, sigma) = (b[0], b[1]);
        (-Complex64::new(gamma + sigma * sigma * t, eps) * t).exp()
    }

    fn broadening_factor(t: f64, b: &[f64], k: usize) -> f64 {
        match k {
            0 => -t,
            _ => -2.0 * b[1] * t * t,
        }
    }
}

/// Voigt model operations
pub static FUNCTIONS: ModelFunctions = ModelFunctions {
    err,
    grad,
    forward,
    x2param,
    jacobian,
};

pub fn err(x: &[f64], ctx: &ModelContext) -> f64 {
    engine::err::<Voigt>(x, ctx)
}

pub fn grad(x: &[f64], ctx: &ModelContext) -> Vec<f64> {
    engine::grad::<Voigt>(x, ctx)
}

pub fn forward(x: &[f64], ctx: &ModelContext) -> Array1<Complex64> {
    engine::forward::<Voigt>(x, ctx)
}

pub fn x2param(x: &[f64], n: usize, g: usize) -> ModelParams {
    engine::x2param::<Voigt>(x, n, g)
}

pub fn jacobian(x: &[f64], ctx: &ModelContext) -> Array2<Complex64> {
    engine::jacobian::<Voigt>(x, ctx)
}
