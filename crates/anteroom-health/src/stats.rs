//! Sample statistics over latency measurements.

use anteroom_state::BaselineStats;

/// Mean and sample standard deviation of one sampling run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    /// Sample mean, milliseconds.
    pub mean: f64,
    /// Sample standard deviation (divisor N-1), milliseconds.
    pub std_dev: f64,
}

impl From<SampleStats> for BaselineStats {
    fn from(s: SampleStats) -> Self {
        BaselineStats {
            mean: s.mean,
            std_dev: s.std_dev,
        }
    }
}

/// Compute sample statistics. Returns `None` for fewer than two
/// samples — the unbiased variance needs at least two.
pub fn sample_stats(samples: &[f64]) -> Option<SampleStats> {
    if samples.len() < 2 {
        return None;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let sum_sq_diff: f64 = samples.iter().map(|s| (s - mean).powi(2)).sum();
    let std_dev = (sum_sq_diff / (samples.len() - 1) as f64).sqrt();
    Some(SampleStats { mean, std_dev })
}

/// The three-sigma health check: a fresh sample mean passes while it
/// stays below `baseline.mean + 3 x baseline.std_dev`.
pub fn within_limit(baseline: &BaselineStats, fresh_mean: f64) -> bool {
    fresh_mean < baseline.mean + 3.0 * baseline.std_dev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_std_dev() {
        // Population sd of this set is 2; the sample (N-1) sd is larger.
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = sample_stats(&samples).unwrap();

        assert!((stats.mean - 5.0).abs() < 1e-12);
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((stats.std_dev - expected).abs() < 1e-12);
    }

    #[test]
    fn identical_samples_have_zero_deviation() {
        let stats = sample_stats(&[10.0; 20]).unwrap();
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn too_few_samples_yield_nothing() {
        assert!(sample_stats(&[]).is_none());
        assert!(sample_stats(&[42.0]).is_none());
    }

    #[test]
    fn three_sigma_boundary() {
        let baseline = BaselineStats {
            mean: 100.0,
            std_dev: 10.0,
        };
        // Limit is 130: strictly below passes, at or above fails.
        assert!(within_limit(&baseline, 129.0));
        assert!(!within_limit(&baseline, 130.0));
        assert!(!within_limit(&baseline, 131.0));
    }

    #[test]
    fn zero_deviation_baseline_tolerates_nothing() {
        let baseline = BaselineStats {
            mean: 50.0,
            std_dev: 0.0,
        };
        assert!(within_limit(&baseline, 49.9));
        assert!(!within_limit(&baseline, 50.0));
    }
}
