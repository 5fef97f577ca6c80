/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Shared evaluation of the forward model, its Jacobian and its loss
//!
//! The variants only differ in the per-group time-domain decay and its
//! derivatives, which [`LineShape`] provides.

#![allow(clippy::needless_range_loop)]

use super::{ModelContext, ModelKind, ModelParams, ParamLayout};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Per-group time-domain decay of a line-shape variant
pub(crate) trait LineShape {
    const KIND: ModelKind;

    /// Decay envelope at time `t` for broadening terms `b` and shift `eps`
    fn decay(t: f64, b: &[f64], eps: f64) -> Complex64;

    /// d(decay)/d(b[k]) divided by the decay itself
    fn broadening_factor(t: f64, b: &[f64], k: usize) -> f64;
}

pub(crate) fn x2param<L: LineShape>(x: &[f64], n: usize, g: usize) -> ModelParams {
    ParamLayout::from_len(L::KIND, n, g, x.len()).decode(x)
}

/// Broadening terms of group `gg`
fn group_broadening(x: &[f64], layout: &ParamLayout, gg: usize) -> Vec<f64> {
    (0..layout.kind.num_broadening())
        .map(|k| x[layout.broadening(k).start + gg])
        .collect()
}

/// Decay envelopes, (points x groups)
fn group_decays<L: LineShape>(x: &[f64], layout: &ParamLayout, ctx: &ModelContext) -> Array2<Complex64> {
    let n_points = ctx.num_points();
    let mut decays = Array2::<Complex64>::zeros((n_points, layout.n_groups));
    for gg in 0..layout.n_groups {
        let b = group_broadening(x, layout, gg);
        let eps = x[layout.eps().start + gg];
        for t in 0..n_points {
            decays[(t, gg)] = L::decay(ctx.time[t], &b, eps);
        }
    }
    decays
}

/// Linear phase `exp(i (phi0 + phi1 f))` for every bin
fn phase_ramp(x: &[f64], layout: &ParamLayout, ctx: &ModelContext) -> Array1<Complex64> {
    let phi0 = x[layout.phi0()];
    let phi1 = x[layout.phi1()];
    ctx.frequency
        .mapv(|f| Complex64::from_polar(1.0, phi0 + phi1 * f))
}

/// Concentration-weighted sum of the decayed basis in the frequency domain
fn metabolite_spectrum(x: &[f64], layout: &ParamLayout, ctx: &ModelContext, decays: &Array2<Complex64>) -> Vec<Complex64> {
    let n_points = ctx.num_points();
    let groups = ctx.groups.as_slice();
    let mut fid = vec![Complex64::new(0.0, 0.0); n_points];
    for j in 0..layout.n_basis {
        let c = x[j];
        if c == 0.0 {
            continue;
        }
        let gg = groups[j];
        for t in 0..n_points {
            fid[t] += c * ctx.basis[(t, j)] * decays[(t, gg)];
        }
    }
    ctx.transform().spectrum_in_place(&mut fid);
    fid
}

pub(crate) fn forward<L: LineShape>(x: &[f64], ctx: &ModelContext) -> Array1<Complex64> {
    let layout = ctx.layout(L::KIND);
    let decays = group_decays::<L>(x, &layout, ctx);
    let metab = metabolite_spectrum(x, &layout, ctx, &decays);
    let phase = phase_ramp(x, &layout, ctx);

    let coeffs = &x[layout.baseline()];
    let mut out = Array1::<Complex64>::zeros(ctx.num_points());
    for t in 0..ctx.num_points() {
        let mut v = phase[t] * metab[t];
        for (k, b) in coeffs.iter().enumerate() {
            v += *b * ctx.baseline[(t, k)];
        }
        out[t] = v;
    }
    out
}

pub(crate) fn err<L: LineShape>(x: &[f64], ctx: &ModelContext) -> f64 {
    let pred = forward::<L>(x, ctx);
    let mut sse = 0.0;
    for t in ctx.first..ctx.last {
        sse += (ctx.data[t] - pred[t]).norm_sqr();
    }
    sse / 2.0
}

pub(crate) fn jacobian<L: LineShape>(x: &[f64], ctx: &ModelContext) -> Array2<Complex64> {
    let layout = ctx.layout(L::KIND);
    let n_points = ctx.num_points();
    let groups = ctx.groups.as_slice();
    let decays = group_decays::<L>(x, &layout, ctx);
    let phase = phase_ramp(x, &layout, ctx);
    let (first, last) = (ctx.first, ctx.last);
    let mut jac = Array2::<Complex64>::zeros((last - first, layout.len()));
    let i_unit = Complex64::new(0.0, 1.0);

    let mut buffer = vec![Complex64::new(0.0, 0.0); n_points];
    let mut metab = vec![Complex64::new(0.0, 0.0); n_points];

    // Concentrations: each decayed basis spectrum on its own
    for j in 0..layout.n_basis {
        let gg = groups[j];
        for t in 0..n_points {
            buffer[t] = ctx.basis[(t, j)] * decays[(t, gg)];
        }
        ctx.transform().spectrum_in_place(&mut buffer);
        for f in 0..n_points {
            metab[f] += x[j] * buffer[f];
        }
        for f in first..last {
            jac[(f - first, j)] = phase[f] * buffer[f];
        }
    }

    // Line-shape terms act on each group's weighted sum
    for gg in 0..layout.n_groups {
        let b = group_broadening(x, &layout, gg);
        let mut group_fid = vec![Complex64::new(0.0, 0.0); n_points];
        for j in (0..layout.n_basis).filter(|&j| groups[j] == gg) {
            for t in 0..n_points {
                group_fid[t] += x[j] * ctx.basis[(t, j)] * decays[(t, gg)];
            }
        }

        for k in 0..layout.kind.num_broadening() {
            for t in 0..n_points {
                buffer[t] = group_fid[t] * L::broadening_factor(ctx.time[t], &b, k);
            }
            ctx.transform().spectrum_in_place(&mut buffer);
            let col = layout.broadening(k).start + gg;
            for f in first..last {
                jac[(f - first, col)] = phase[f] * buffer[f];
            }
        }

        for t in 0..n_points {
            buffer[t] = group_fid[t] * (-i_unit * ctx.time[t]);
        }
        ctx.transform().spectrum_in_place(&mut buffer);
        let col = layout.eps().start + gg;
        for f in first..last {
            jac[(f - first, col)] = phase[f] * buffer[f];
        }
    }

    for f in first..last {
        let rotated = i_unit * phase[f] * metab[f];
        jac[(f - first, layout.phi0())] = rotated;
        jac[(f - first, layout.phi1())] = rotated * ctx.frequency[f];
    }

    for (k, col) in layout.baseline().enumerate() {
        for f in first..last {
            jac[(f - first, col)] = ctx.baseline[(f, k)];
        }
    }

    jac
}

/// Gradient of `err`: `-Re(J^H r)` over the window
pub(crate) fn grad<L: LineShape>(x: &[f64], ctx: &ModelContext) -> Vec<f64> {
    let pred = forward::<L>(x, ctx);
    let jac = jacobian::<L>(x, ctx);
    let (first, last) = (ctx.first, ctx.last);
    let mut g = vec![0.0; jac.ncols()];
    for (p, gp) in g.iter_mut().enumerate() {
        let mut s = 0.0;
        for f in first..last {
            let r = ctx.data[f] - pred[f];
            s -= (jac[(f - first, p)].conj() * r).re;
        }
        *gp = s;
    }
    g
}
