/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Synthetic 1H data shared by the integration tests

#![allow(dead_code)]

use mrsfit_rs::spectrum::{BasisSet, Nucleus, Spectrum};
use ndarray::Array1;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::f64::consts::PI;

pub const N_POINTS: usize = 1024;
/// 4 kHz bandwidth
pub const DWELL: f64 = 2.5e-4;
/// 2.89 T
pub const CENTRAL_FREQ: f64 = 123.2;
/// Damping already present in the basis signals (1/s)
pub const BASIS_DAMPING: f64 = 2.0;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sum of singlets given as (ppm, protons)
pub fn singlets(peaks: &[(f64, f64)]) -> Array1<Complex64> {
    Array1::from_shape_fn(N_POINTS, |n| {
        let t = n as f64 * DWELL;
        peaks
            .iter()
            .map(|&(ppm, protons)| {
                let f = (ppm - 4.65) * CENTRAL_FREQ;
                protons * Complex64::from_polar(1.0, 2.0 * PI * f * t) * (-BASIS_DAMPING * t).exp()
            })
            .sum()
    })
}

pub fn creatine() -> Array1<Complex64> {
    singlets(&[(3.03, 3.0), (3.92, 2.0)])
}

pub fn phosphocreatine() -> Array1<Complex64> {
    singlets(&[(3.03, 3.0), (3.94, 2.0)])
}

pub fn naa() -> Array1<Complex64> {
    singlets(&[(2.01, 3.0), (2.60, 1.0)])
}

pub fn choline() -> Array1<Complex64> {
    singlets(&[(3.20, 9.0)])
}

pub fn basis_of(names: &[&str]) -> BasisSet {
    let columns = names
        .iter()
        .map(|n| match *n {
            "Cr" => creatine(),
            "PCr" => phosphocreatine(),
            "NAA" => naa(),
            "Cho" => choline(),
            other => panic!("no synthetic signal for {}", other),
        })
        .collect();
    BasisSet::from_columns(columns, names.iter().map(|s| s.to_string()).collect()).unwrap()
}

/// Lorentzian-broadened mixture `sum_j conc_j basis_j exp(-gamma t)` plus noise
pub fn observed(basis: &BasisSet, conc: &[f64], gamma: f64, noise: f64, seed: u64) -> Spectrum {
    observed_voigt(basis, conc, gamma, 0.0, noise, seed)
}

pub fn observed_voigt(
    basis: &BasisSet,
    conc: &[f64],
    gamma: f64,
    sigma: f64,
    noise: f64,
    seed: u64,
) -> Spectrum {
    let mut rng = StdRng::seed_from_u64(seed);
    let fid = Array1::from_shape_fn(N_POINTS, |n| {
        let t = n as f64 * DWELL;
        let decay = (-(gamma + sigma * sigma * t) * t).exp();
        let mut v = Complex64::new(0.0, 0.0);
        for (j, c) in conc.iter().enumerate() {
            v += *c * basis.fids()[(n, j)] * decay;
        }
        v
    });
    let noisy = fid.mapv(|v| {
        let re: f64 = rng.sample(StandardNormal);
        let im: f64 = rng.sample(StandardNormal);
        v + Complex64::new(re, im) * noise
    });
    Spectrum::new(noisy, DWELL, CENTRAL_FREQ, Nucleus::H1).unwrap()
}

/// Water singlet at 4.65 ppm carrying `amplitude` per proton
pub fn water(amplitude: f64, gamma: f64) -> Spectrum {
    let fid = Array1::from_shape_fn(N_POINTS, |n| {
        let t = n as f64 * DWELL;
        Complex64::new(2.0 * amplitude * (-gamma * t).exp(), 0.0)
    });
    Spectrum::new(fid, DWELL, CENTRAL_FREQ, Nucleus::H1).unwrap()
}
