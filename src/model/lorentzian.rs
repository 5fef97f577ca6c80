/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Lorentzian line-shape model
//!
//! Each group decays its basis signals by `exp(-(gamma + i eps) t)`.

use super::engine::{self, LineShape};
use super::{ModelContext, ModelFunctions, ModelKind, ModelParams};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

pub(crate) struct Lorentzian;

impl LineShape for Lorentzian {
    const KIND: ModelKind = ModelKind::Lorentzian;

    fn decay(t: f64, b: &[f64], eps: f64) -> Complex64 {
        (-Complex64::new(b[0], eps) * t).exp()
    }

    fn broadening_factor(t: f64, _b: &[f64], _k: usize) -> f64 {
        -t
    }
}

/// Lorentzian model operations
pub static FUNCTIONS: ModelFunctions = ModelFunctions {
    err,
    grad,
    forward,
    x2param,
    jacobian,
};

pub fn err(x: &[f64], ctx: &ModelContext) -> f64 {
    engine::err::<Lorentzian>(x, ctx)
}

pub fn grad(x: &[f64], ctx: &ModelContext) -> Vec<f64> {
    engine::grad::<Lorentzian>(x, ctx)
}

pub fn forward(x: &[f64], ctx: &ModelContext) -> Array1<Complex64> {
    engine::forward::<Lorentzian>(x, ctx)
}

pub fn x2param(x: &[f64], n: usize, g: usize) -> ModelParams {
    engine::x2param::<Lorentzian>(x, n, g)
}

pub fn jacobian(x: &[f64], ctx: &ModelContext) -> Array2<Complex64> {
    engine::jacobian::<Lorentzian>(x, ctx)
}
