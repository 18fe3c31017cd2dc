//! Paired bootstrap confidence intervals for accuracy differences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_RESAMPLES: usize = 2000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ALPHA: f64 = 0.05;

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Percentile `q` in [0, 100] with linear interpolation between order statistics.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// CI of `mean(other) - mean(base)` over paired samples. Both slices must
/// have equal length; `None` when they are empty or mismatched.
pub fn paired_bootstrap_diff(
    base: &[f64],
    other: &[f64],
    resamples: usize,
    seed: u64,
    alpha: f64,
) -> Option<(f64, f64)> {
    let n = base.len();
    if n == 0 || other.len() != n || resamples == 0 {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut diffs = Vec::with_capacity(resamples);
    for _ in 0..resamples {
        let (mut sum_base, mut sum_other) = (0.0, 0.0);
        for _ in 0..n {
            let i = rng.gen_range(0..n);
            sum_base += base[i];
            sum_other += other[i];
        }
        diffs.push((sum_other - sum_base) / n as f64);
    }
    let low = percentile(&diffs, 100.0 * (alpha / 2.0))?;
    let high = percentile(&diffs, 100.0 * (1.0 - alpha / 2.0))?;
    Some((low, high))
}

/// Observed difference of means.
pub fn mean_diff(base: &[f64], other: &[f64]) -> f64 {
    mean(other) - mean(base)
}
