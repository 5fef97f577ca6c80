/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Adaptive Metropolis-Hastings sampler
//!
//! Component-wise random-walk proposals with one Gaussian width per sampled
//! dimension. Widths are tuned during burn-in only, so the retained chain
//! comes from a fixed proposal.

#![allow(clippy::needless_range_loop)]

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Sampler settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetropolisHastings {
    /// Jumps discarded before samples are kept
    pub burnin: usize,
    /// Jumps kept after burn-in
    pub njumps: usize,
    /// Burn-in jumps between proposal width updates
    pub update_every: usize,
    /// Starting proposal width for every dimension
    pub initial_width: f64,
    pub seed: u64,
}

impl Default for MetropolisHastings {
    fn default() -> Self {
        Self {
            burnin: 100,
            njumps: 500,
            update_every: 10,
            initial_width: 1.0,
            seed: 0,
        }
    }
}

/// Retained chain plus per-dimension post burn-in acceptance rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McmcSamples {
    /// One parameter vector per retained jump
    pub samples: Vec<Vec<f64>>,
    /// Accepted fraction of proposals, zero for dimensions not sampled
    pub acceptance_rate: Vec<f64>,
}

impl McmcSamples {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample mean of every dimension
    pub fn mean(&self) -> Vec<f64> {
        let dim = self.samples.first().map_or(0, |s| s.len());
        let mut mean = vec![0.0; dim];
        for s in &self.samples {
            for (m, v) in mean.iter_mut().zip(s) {
                *m += v;
            }
        }
        let n = self.samples.len().max(1) as f64;
        mean.iter_mut().for_each(|m| *m /= n);
        mean
    }

    /// Chain of one dimension
    pub fn column(&self, i: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s[i]).collect()
    }
}

impl MetropolisHastings {
    pub fn new(burnin: usize, njumps: usize) -> Self {
        Self {
            burnin,
            njumps,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_update_every(mut self, update_every: usize) -> Self {
        self.update_every = update_every.max(1);
        self
    }

    /// Run the chain from `p0`
    ///
    /// Only dimensions with `mask[i]` set are proposed, the rest stay at
    /// their starting value. A start point outside the bounds is clamped
    /// onto them. Proposals falling outside the bounds are rejected without
    /// evaluating the posterior.
    pub fn fit<L, P>(
        &self,
        loglik: L,
        logprior: P,
        p0: &[f64],
        lower: &[f64],
        upper: &[f64],
        mask: &[bool],
    ) -> McmcSamples
    where
        L: Fn(&[f64]) -> f64,
        P: Fn(&[f64]) -> f64,
    {
        let dim = p0.len();
        let mut p = p0.to_vec();
        let mut clamped = 0;
        for i in 0..dim {
            let c = p[i].max(lower[i]).min(upper[i]);
            if c != p[i] {
                clamped += 1;
                p[i] = c;
            }
        }
        if clamped > 0 {
            warn!("Clamped {} starting values onto the sampler bounds", clamped);
        }

        let log_post = |x: &[f64]| {
            let v = loglik(x) + logprior(x);
            if v.is_nan() {
                f64::NEG_INFINITY
            } else {
                v
            }
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut widths = vec![self.initial_width; dim];
        let mut accepted = vec![0usize; dim];
        let mut rejected = vec![0usize; dim];
        let mut kept_accepted = vec![0usize; dim];
        let mut current = log_post(&p);
        let update_every = self.update_every.max(1);
        let mut samples = Vec::with_capacity(self.njumps);

        for jump in 0..self.burnin + self.njumps {
            let burning = jump < self.burnin;
            for i in (0..dim).filter(|&i| mask[i]) {
                let z: f64 = rng.sample(StandardNormal);
                let proposal = p[i] + widths[i] * z;
                if proposal < lower[i] || proposal > upper[i] {
                    rejected[i] += 1;
                    continue;
                }
                let previous = p[i];
                p[i] = proposal;
                let candidate = log_post(&p);
                let u: f64 = rng.random();
                if u.ln() < candidate - current {
                    current = candidate;
                    accepted[i] += 1;
                    if !burning {
                        kept_accepted[i] += 1;
                    }
                } else {
                    p[i] = previous;
                    rejected[i] += 1;
                }
            }

            if burning && (jump + 1) % update_every == 0 {
                for i in 0..dim {
                    widths[i] *= ((1 + accepted[i]) as f64 / (1 + rejected[i]) as f64).sqrt();
                    accepted[i] = 0;
                    rejected[i] = 0;
                }
            }
            if !burning {
                samples.push(p.clone());
            }
        }

        let acceptance_rate: Vec<f64> = kept_accepted
            .iter()
            .map(|&a| a as f64 / self.njumps.max(1) as f64)
            .collect();
        debug!(
            "Sampler kept {} jumps, mean acceptance {:.3}",
            samples.len(),
            acceptance_rate
                .iter()
                .zip(mask)
                .filter(|(_, m)| **m)
                .map(|(a, _)| *a)
                .sum::<f64>()
                / mask.iter().filter(|m| **m).count().max(1) as f64
        );
        McmcSamples {
            samples,
            acceptance_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gaussian(x: &[f64]) -> f64 {
        -0.5 * ((x[0] - 2.0) / 0.5).powi(2)
    }

    #[test]
    fn test_samples_gaussian_target() {
        let mh = MetropolisHastings::new(500, 4000).with_seed(7);
        let out = mh.fit(gaussian, |_| 0.0, &[0.0, 1.0], &[-10.0, -10.0], &[10.0, 10.0], &[true, false]);
        assert_eq!(out.len(), 4000);
        let chain = out.column(0);
        let mean = chain.iter().sum::<f64>() / chain.len() as f64;
        assert_relative_eq!(mean, 2.0, epsilon = 0.15);
        // Unmasked dimension never moves
        assert!(out.column(1).iter().all(|v| *v == 1.0));
        assert_eq!(out.acceptance_rate[1], 0.0);
        assert!(out.acceptance_rate[0] > 0.05);
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let mh = MetropolisHastings::new(50, 300).with_seed(1);
        let out = mh.fit(|_| 0.0, |_| 0.0, &[5.0], &[0.0], &[1.0], &[true]);
        // Start point clamped onto the upper bound
        assert!(out.samples.iter().all(|s| (0.0..=1.0).contains(&s[0])));
    }

    #[test]
    fn test_same_seed_same_chain() {
        let mh = MetropolisHastings::new(20, 50).with_seed(3);
        let a = mh.fit(gaussian, |_| 0.0, &[0.0], &[-5.0], &[5.0], &[true]);
        let b = mh.fit(gaussian, |_| 0.0, &[0.0], &[-5.0], &[5.0], &[true]);
        assert_eq!(a, b);
    }
}
