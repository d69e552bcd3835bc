//! Monte Carlo mutual-information tests.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use spike_info::{
    fit_gaussians, monte_carlo_mutual_information, GroupingKey, MixtureMode, MixtureModel,
    MonteCarloEstimator, MultivariateGaussian, ResponseDistribution, TrialRecord, TrialTable,
    UnivariateGaussian,
};

fn gaussians(means: &[f64]) -> MixtureModel {
    let components: Vec<Arc<dyn ResponseDistribution>> = means
        .iter()
        .map(|&m| Arc::new(UnivariateGaussian::new(m, 1.0).unwrap()) as Arc<dyn ResponseDistribution>)
        .collect();
    MixtureModel::uniform(components).unwrap()
}

/// Two well-separated categories carry one bit, within three standard errors.
#[test]
fn separated_gaussians_give_one_bit() {
    let model = gaussians(&[-5.0, 5.0]);
    for seed in 0..5 {
        let estimate = MonteCarloEstimator::new()
            .samples(20_000)
            .seed(seed)
            .estimate(&model)
            .unwrap();

        assert_eq!(estimate.n_requested, 20_000);
        assert!(estimate.n_retained > 19_900);
        assert!(estimate.standard_error > 0.0);
        assert!(
            (estimate.bits - 1.0).abs() <= 3.0 * estimate.standard_error,
            "seed {seed}: estimate {} ± {}",
            estimate.bits,
            estimate.standard_error
        );
    }
}

/// Excluding the generating category inflates the estimate.
#[test]
fn anthropic_mode_is_higher() {
    let model = gaussians(&[-5.0, 5.0]);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
    let standard =
        monte_carlo_mutual_information(&model, 20_000, MixtureMode::Standard, &mut rng).unwrap();
    let anthropic =
        monte_carlo_mutual_information(&model, 20_000, MixtureMode::Anthropic, &mut rng).unwrap();

    assert!(anthropic.bits > standard.bits + 1.0);
    assert!(anthropic.standard_error > 0.0);
}

/// Four equiprobable, separated categories carry two bits.
#[test]
fn four_categories_give_two_bits() {
    let model = gaussians(&[-30.0, -10.0, 10.0, 30.0]);
    let estimate = MonteCarloEstimator::new()
        .samples(10_000)
        .seed(8)
        .estimate(&model)
        .unwrap();
    assert!((estimate.bits - 2.0).abs() < 1e-3);
}

/// Overlapping categories carry strictly less than their entropy.
#[test]
fn overlap_reduces_information() {
    let close = MonteCarloEstimator::new()
        .samples(10_000)
        .seed(4)
        .estimate(&gaussians(&[-0.5, 0.5]))
        .unwrap();
    let far = MonteCarloEstimator::new()
        .samples(10_000)
        .seed(4)
        .estimate(&gaussians(&[-2.0, 2.0]))
        .unwrap();

    assert!(close.bits > 0.0 && close.bits < far.bits);
    assert!(far.bits < 1.0);
}

/// Unequal weights bound the information by the weight entropy.
#[test]
fn weighted_mixture_bounded_by_prior_entropy() {
    let components: Vec<Arc<dyn ResponseDistribution>> = vec![
        Arc::new(UnivariateGaussian::new(-8.0, 1.0).unwrap()),
        Arc::new(UnivariateGaussian::new(8.0, 1.0).unwrap()),
    ];
    let model = MixtureModel::new(components, vec![1.0, 3.0]).unwrap();
    let entropy = -(0.25f64 * 0.25f64.log2() + 0.75 * 0.75f64.log2());

    let estimate = MonteCarloEstimator::new()
        .samples(20_000)
        .seed(31)
        .estimate(&model)
        .unwrap();
    assert!((estimate.bits - entropy).abs() < 0.03);
}

/// Gaussians fitted to clustered features recover the cluster information.
#[test]
fn fitted_multivariate_mixture() {
    let records: Vec<TrialRecord> = (0..2)
        .flat_map(|stim| (0..20).map(move |trial| TrialRecord::new(0, 0, stim, stim, trial)))
        .collect();
    let table = TrialTable::new(records).unwrap();
    let features = DMatrix::from_fn(40, 2, |i, j| {
        let centre = if i < 20 { -10.0 } else { 10.0 };
        // Deterministic jitter around the centre
        centre + (((i * 13 + j * 7) % 9) as f64 - 4.0) * 0.25
    });

    let (categories, model) = fit_gaussians(&table, &features, GroupingKey::Stimulus).unwrap();
    assert_eq!(categories, vec![0, 1]);
    assert_eq!(model.dim(), 2);

    let estimate = MonteCarloEstimator::new()
        .samples(5_000)
        .seed(12)
        .estimate(&model)
        .unwrap();
    assert!((estimate.bits - 1.0).abs() < 1e-3);
}

/// A degenerate covariance still yields a usable density.
#[test]
fn singular_covariance_component() {
    let flat = MultivariateGaussian::new(
        DVector::from_vec(vec![0.0, 0.0]),
        DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]),
    )
    .unwrap();
    let wide = MultivariateGaussian::new(DVector::from_vec(vec![0.0, 50.0]), DMatrix::identity(2, 2))
        .unwrap();
    let components: Vec<Arc<dyn ResponseDistribution>> = vec![Arc::new(flat), Arc::new(wide)];
    let model = MixtureModel::uniform(components).unwrap();

    let estimate = MonteCarloEstimator::new()
        .samples(2_000)
        .seed(5)
        .estimate(&model)
        .unwrap();
    assert!(estimate.bits.is_finite());
    assert!(estimate.bits > 0.9);
}
