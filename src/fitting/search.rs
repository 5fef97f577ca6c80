/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Derivative-free minimisation of small scalar objectives
//!
//! The initialisers only search over two or three nonlinear terms, so a
//! Nelder-Mead simplex from argmin is sufficient.

use super::errors::Result;
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::neldermead::NelderMead;

/// Adapts a closure to argmin's cost-function interface
struct ClosureCost<F> {
    f: F,
}

impl<F> CostFunction for ClosureCost<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        let c = (self.f)(param);
        // Keep the simplex ordering well defined when a trial point overflows
        Ok(if c.is_finite() { c } else { f64::MAX })
    }
}

/// Best point and cost found by [`nelder_mead`]
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub param: Vec<f64>,
    pub cost: f64,
    pub iterations: u64,
}

/// Minimise `f` starting from a simplex around `x0`
///
/// The initial simplex holds `x0` and one vertex per dimension displaced by
/// the matching entry of `steps`.
pub fn nelder_mead<F>(f: F, x0: &[f64], steps: &[f64], max_iters: u64) -> Result<SearchOutcome>
where
    F: Fn(&[f64]) -> f64,
{
    let mut simplex = vec![x0.to_vec()];
    for (i, step) in steps.iter().enumerate() {
        let mut vertex = x0.to_vec();
        vertex[i] += step;
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex).with_sd_tolerance(1e-10)?;
    let res = Executor::new(ClosureCost { f }, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()?;

    let state = res.state();
    let param = state
        .get_best_param()
        .cloned()
        .unwrap_or_else(|| x0.to_vec());
    Ok(SearchOutcome {
        param,
        cost: state.get_best_cost(),
        iterations: state.get_iter(),
    })
}
