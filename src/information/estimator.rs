//! Monte Carlo estimate of I(category; response) for a mixture model.
//!
//! Each sample draws a category from the mixture weights, a response from
//! that category's distribution, and scores `log2(p(r | c) / p(r))`. The
//! estimate is the sum of scores over the requested sample count; the
//! standard error uses only the samples whose conditional density cleared
//! the floor.

use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::mixture::MixtureModel;
use crate::constants::DENSITY_FLOOR;
use crate::error::{Error, Result};
use crate::statistics::{counter_rng_seed, rng_from_seed, RunningMoments};

/// Which categories enter the denominator `p(r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MixtureMode {
    /// All categories, with their mixture weights.
    #[default]
    Standard,
    /// Every category except the one that generated the sample, weights
    /// renormalized over the rest.
    Anthropic,
}

/// Mutual information estimate in bits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationEstimate {
    /// Sum of retained log-ratios divided by the requested sample count.
    pub bits: f64,
    /// Sample standard deviation of retained log-ratios over `sqrt(n_retained)`.
    pub standard_error: f64,
    /// Samples requested.
    pub n_requested: usize,
    /// Samples whose conditional density exceeded the floor.
    pub n_retained: usize,
}

impl InformationEstimate {
    /// Samples dropped below the density floor.
    pub fn n_dropped(&self) -> usize {
        self.n_requested.saturating_sub(self.n_retained)
    }
}

/// Estimate mutual information between category and response with `n` samples.
///
/// Samples are scored independently, each from its own generator seeded from
/// one draw of `rng`, so results do not depend on how work is split between
/// threads.
pub fn monte_carlo_mutual_information<R: Rng + ?Sized>(
    model: &MixtureModel,
    n: usize,
    mode: MixtureMode,
    rng: &mut R,
) -> Result<InformationEstimate> {
    if n == 0 {
        return Err(Error::invalid("samples", "must be at least 1"));
    }
    if mode == MixtureMode::Anthropic && model.len() < 2 {
        return Err(Error::degenerate(
            "anthropic mode needs at least two categories",
        ));
    }
    let categories: WeightedIndex<f64> = WeightedIndex::new(model.weights())
        .map_err(|e| Error::degenerate(format!("mixture weights: {e}")))?;
    let base_seed: u64 = rng.random();

    let score = |i: usize| -> Option<f64> {
        let mut sample_rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, i as u64));
        let c = categories.sample(&mut sample_rng);
        let dist = model.component(c)?;
        let response = dist.sample(&mut sample_rng);

        let p_cond = dist.pdf(&response);
        if !(p_cond > DENSITY_FLOOR) {
            return None;
        }
        let p_response = match mode {
            MixtureMode::Standard => model.density(&response),
            MixtureMode::Anthropic => model.density_excluding(&response, c)?,
        };
        if !(p_response > 0.0) {
            return None;
        }
        Some((p_cond / p_response).log2())
    };

    #[cfg(feature = "parallel")]
    let moments = crate::thread_pool::install(|| {
        (0..n)
            .into_par_iter()
            .fold(RunningMoments::new, |mut acc, i| {
                if let Some(v) = score(i) {
                    acc.update(v);
                }
                acc
            })
            .reduce(RunningMoments::new, RunningMoments::merge)
    });

    #[cfg(not(feature = "parallel"))]
    let moments = crate::thread_pool::install(|| {
        (0..n).fold(RunningMoments::new(), |mut acc, i| {
            if let Some(v) = score(i) {
                acc.update(v);
            }
            acc
        })
    });

    let n_retained = moments.count();
    debug!(
        requested = n,
        retained = n_retained,
        dropped = n - n_retained,
        mode = ?mode,
        "Monte Carlo samples scored"
    );

    let std = moments.sample_std().ok_or_else(|| {
        Error::degenerate(format!(
            "only {n_retained} of {n} samples cleared the density floor"
        ))
    })?;

    Ok(InformationEstimate {
        bits: moments.sum() / n as f64,
        standard_error: std / (n_retained as f64).sqrt(),
        n_requested: n,
        n_retained,
    })
}

/// Reusable Monte Carlo settings.
///
/// ```ignore
/// let estimate = MonteCarloEstimator::new()
///     .samples(50_000)
///     .anthropic()
///     .seed(7)
///     .estimate(&mixture)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloEstimator {
    /// Number of samples drawn.
    pub samples: usize,
    /// Denominator mode.
    pub mode: MixtureMode,
    /// Seed for reproducible estimates; random when unset.
    pub seed: Option<u64>,
}

impl Default for MonteCarloEstimator {
    fn default() -> Self {
        Self {
            samples: 10_000,
            mode: MixtureMode::Standard,
            seed: None,
        }
    }
}

impl MonteCarloEstimator {
    /// Estimator with default settings (10,000 samples, standard mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample count.
    pub fn samples(mut self, n: usize) -> Self {
        self.samples = n;
        self
    }

    /// Set the denominator mode.
    pub fn mode(mut self, mode: MixtureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(MixtureMode::Anthropic)`.
    pub fn anthropic(self) -> Self {
        self.mode(MixtureMode::Anthropic)
    }

    /// Fix the seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run the estimate on `model`.
    pub fn estimate(&self, model: &MixtureModel) -> Result<InformationEstimate> {
        let mut rng = rng_from_seed(self.seed);
        monte_carlo_mutual_information(model, self.samples, self.mode, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::information::{ResponseDistribution, UnivariateGaussian};
    use std::sync::Arc;

    fn separated(mean: f64) -> MixtureModel {
        let components: Vec<Arc<dyn ResponseDistribution>> = vec![
            Arc::new(UnivariateGaussian::new(-mean, 1.0).unwrap()),
            Arc::new(UnivariateGaussian::new(mean, 1.0).unwrap()),
        ];
        MixtureModel::uniform(components).unwrap()
    }

    #[test]
    fn test_identical_components_carry_no_information() {
        let estimate = MonteCarloEstimator::new()
            .samples(2_000)
            .seed(3)
            .estimate(&separated(0.0))
            .unwrap();
        assert!(estimate.bits.abs() < 1e-12);
        assert_eq!(estimate.n_retained, 2_000);
    }

    #[test]
    fn test_seed_reproducible() {
        let model = separated(1.0);
        let a = MonteCarloEstimator::new().samples(1_000).seed(9).estimate(&model).unwrap();
        let b = MonteCarloEstimator::new().samples(1_000).seed(9).estimate(&model).unwrap();
        assert_eq!(a.n_retained, b.n_retained);
        assert!((a.bits - b.bits).abs() < 1e-12);
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(MonteCarloEstimator::new()
            .samples(0)
            .estimate(&separated(1.0))
            .is_err());
    }

    #[test]
    fn test_anthropic_needs_two_categories() {
        let components: Vec<Arc<dyn ResponseDistribution>> =
            vec![Arc::new(UnivariateGaussian::new(0.0, 1.0).unwrap())];
        let model = MixtureModel::uniform(components).unwrap();
        let err = MonteCarloEstimator::new()
            .anthropic()
            .seed(1)
            .estimate(&model)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DegenerateDistribution);
    }

    #[test]
    fn test_n_dropped_never_underflows() {
        let estimate: InformationEstimate = serde_json::from_str(
            r#"{"bits":0.5,"standard_error":0.01,"n_requested":10,"n_retained":12}"#,
        )
        .unwrap();
        assert_eq!(estimate.n_dropped(), 0);
    }

    #[test]
    fn test_estimate_bounded_by_entropy() {
        let estimate = MonteCarloEstimator::new()
            .samples(5_000)
            .seed(21)
            .estimate(&separated(1.0))
            .unwrap();
        assert!(estimate.bits > 0.0);
        assert!(estimate.bits < 1.0);
        assert!(estimate.standard_error > 0.0);
    }
}
