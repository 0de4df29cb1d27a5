//! Nonparametric bootstrap confidence intervals.
//!
//! The bootstrap approximates the sampling distribution of a mean by
//! resampling the observed units with replacement. Each resample yields one
//! bootstrap mean; the interval is read off the empirical percentiles of those
//! means.
//!
//! # Reproducibility
//!
//! Every resample draws from its own [`Pcg64`] stream whose seed is derived
//! from the base seed and the resample index (see [`iteration_seed`]). No
//! random stream is shared between iterations, so running the resamples on
//! several threads ([`BootstrapConfig::parallel`]) yields exactly the same
//! interval as running them sequentially.
//!
//! # Example
//!
//! ```
//! use slate_ope_stats::bootstrap::{BootstrapConfig, estimate_confidence_interval_by_bootstrap};
//!
//! let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let config = BootstrapConfig {
//!     random_state: Some(12345),
//!     ..BootstrapConfig::default()
//! };
//! let interval = estimate_confidence_interval_by_bootstrap(&samples, &config).unwrap();
//! assert!(interval.lower_bound <= interval.mean);
//! assert!(interval.mean <= interval.upper_bound);
//! ```

use std::{num::NonZeroUsize, thread};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{descriptive, percentiles::Percentiles};

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;
/// Default number of bootstrap resamples.
pub const DEFAULT_N_BOOTSTRAP_SAMPLES: usize = 100;

/// Parameters of a bootstrap interval estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Significance level; the interval covers `1 - alpha`.
    pub alpha: f64,
    /// Number of resamples drawn.
    pub n_bootstrap_samples: usize,
    /// Base seed. `None` draws a fresh seed from the thread RNG.
    pub random_state: Option<u64>,
    /// Spread resamples over scoped worker threads.
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            n_bootstrap_samples: DEFAULT_N_BOOTSTRAP_SAMPLES,
            random_state: None,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum BootstrapError {
    #[display("alpha must be in the open interval (0, 1), but {alpha} is given")]
    InvalidAlpha { alpha: f64 },
    #[display("n_bootstrap_samples must be a positive integer")]
    InvalidSampleCount,
    #[display("cannot bootstrap an empty sample")]
    EmptySample,
    #[display("cannot bootstrap a sample containing non-finite values")]
    NonFiniteSample,
}

impl BootstrapConfig {
    /// Checks `0 < alpha < 1` and `n_bootstrap_samples > 0`.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        // NaN fails both comparisons
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(BootstrapError::InvalidAlpha { alpha: self.alpha });
        }
        if self.n_bootstrap_samples == 0 {
            return Err(BootstrapError::InvalidSampleCount);
        }
        Ok(())
    }

    /// Percentile point of the lower interval bound (`100 * alpha / 2`).
    #[must_use]
    pub fn lower_percentile(&self) -> f64 {
        100.0 * (self.alpha / 2.0)
    }

    /// Percentile point of the upper interval bound (`100 * (1 - alpha / 2)`).
    #[must_use]
    pub fn upper_percentile(&self) -> f64 {
        100.0 * (1.0 - self.alpha / 2.0)
    }
}

/// Bootstrap summary of a sample mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Mean of the bootstrap means.
    pub mean: f64,
    /// Empirical `alpha / 2` percentile of the bootstrap means.
    pub lower_bound: f64,
    /// Empirical `1 - alpha / 2` percentile of the bootstrap means.
    pub upper_bound: f64,
}

/// SplitMix64 finalizer.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derives the seed of resample `iteration` from `base_seed`.
///
/// The base seed is scrambled before the index is added, so nearby base
/// seeds yield disjoint sets of iteration seeds.
#[must_use]
pub fn iteration_seed(base_seed: u64, iteration: u64) -> u64 {
    splitmix64(splitmix64(base_seed).wrapping_add(iteration))
}

/// Mean of one resample of `samples`, drawn with replacement.
fn resample_mean(samples: &[f64], seed: u64) -> f64 {
    let mut rng = Pcg64::seed_from_u64(seed);
    #[expect(clippy::cast_precision_loss)]
    let n = samples.len() as f64;
    (0..samples.len())
        .map(|_| samples[rng.random_range(0..samples.len())])
        .sum::<f64>()
        / n
}

/// Draws `config.n_bootstrap_samples` bootstrap means of `samples`.
///
/// The returned vector is ordered by resample index and does not depend on
/// whether the resamples ran in parallel.
pub fn bootstrap_means(samples: &[f64], config: &BootstrapConfig) -> Result<Vec<f64>, BootstrapError> {
    config.validate()?;
    if samples.is_empty() {
        return Err(BootstrapError::EmptySample);
    }
    if !samples.iter().all(|x| x.is_finite()) {
        return Err(BootstrapError::NonFiniteSample);
    }
    let base_seed = config
        .random_state
        .unwrap_or_else(|| rand::rng().random());

    let mut means = vec![0.0; config.n_bootstrap_samples];
    if config.parallel {
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let chunk_len = means.len().div_ceil(workers).max(1);
        thread::scope(|s| {
            for (chunk_idx, chunk) in means.chunks_mut(chunk_len).enumerate() {
                s.spawn(move || {
                    let offset = chunk_idx * chunk_len;
                    for (i, slot) in chunk.iter_mut().enumerate() {
                        *slot = resample_mean(samples, iteration_seed(base_seed, (offset + i) as u64));
                    }
                });
            }
        });
    } else {
        for (i, slot) in means.iter_mut().enumerate() {
            *slot = resample_mean(samples, iteration_seed(base_seed, i as u64));
        }
    }
    Ok(means)
}

/// Estimates a confidence interval of the mean of `samples` by the
/// nonparametric bootstrap.
pub fn estimate_confidence_interval_by_bootstrap(
    samples: &[f64],
    config: &BootstrapConfig,
) -> Result<ConfidenceInterval, BootstrapError> {
    let means = bootstrap_means(samples, config)?;
    // finite samples can still overflow
    if !means.iter().all(|m| m.is_finite()) {
        return Err(BootstrapError::NonFiniteSample);
    }
    let lower = config.lower_percentile();
    let upper = config.upper_percentile();
    let percentiles = Percentiles::new(&means, &[lower, upper]);
    Ok(ConfidenceInterval {
        mean: descriptive::mean(&means),
        lower_bound: percentiles.get(lower).unwrap_or(f64::NAN),
        upper_bound: percentiles.get(upper).unwrap_or(f64::NAN),
    })
}
