//! Main `TemplateDecoder` entry point and builder.

use std::time::Instant;

use tracing::{debug, info};

use crate::classify::nearest_template_with_ties;
use crate::config::{Config, Smoothing, SubsamplePolicy, TimeWindow};
use crate::confusion::ConfusionMatrix;
use crate::error::{Error, Result};
use crate::preprocess::{bin_spikes, SpikeTrain};
use crate::result::DecodingResult;
use crate::statistics::rng_from_seed;
use crate::table::{GroupingKey, TrialTable};
use crate::template::{
    compute_distances_to_all_templates, template_selectors, DistanceMetric, Summarizer,
    TemplateEngine, TemplateStrategy,
};
use crate::types::FeatureMatrix;

/// Leave-one-out nearest-template decoder.
///
/// Use the builder methods to configure a run, then call [`decode`](Self::decode)
/// with precomputed features or [`decode_spikes`](Self::decode_spikes) with
/// raw spike trains.
///
/// # Example
///
/// ```ignore
/// use spike_info::{GroupingKey, TemplateDecoder};
///
/// let result = TemplateDecoder::new()
///     .grouping(GroupingKey::StimulusType)
///     .seed(42)
///     .decode(&table, &features)?;
///
/// println!("accuracy {:.2}, {:.3} bits", result.accuracy()?, result.information()?);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateDecoder {
    config: Config,
}

impl TemplateDecoder {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Group by stimulus type, keeping every other default.
    pub fn stimulus_types() -> Self {
        Self::new().grouping(GroupingKey::StimulusType)
    }

    /// Build templates from every pooled trial, without sub-sampling.
    ///
    /// Deterministic for a given input; pools of different sizes give
    /// templates of different reliability.
    pub fn full_pools() -> Self {
        Self::new().subsample(SubsamplePolicy::Disabled)
    }

    /// Set the grouping column.
    pub fn grouping(mut self, key: GroupingKey) -> Self {
        self.config.grouping = key;
        self
    }

    /// Set the sub-sampling policy.
    pub fn subsample(mut self, policy: SubsamplePolicy) -> Self {
        self.config.subsample = policy;
        self
    }

    /// Set the summarizer / metric pair.
    pub fn strategy(mut self, strategy: TemplateStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set how pools are summarized.
    pub fn summarizer(mut self, summarizer: Summarizer) -> Self {
        self.config.strategy.summarizer = summarizer;
        self
    }

    /// Set the distance metric.
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config.strategy.metric = metric;
        self
    }

    /// Set the smoothing used by [`decode_spikes`](Self::decode_spikes).
    pub fn smoothing(mut self, smoothing: Smoothing) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    /// Set the binning window used by [`decode_spikes`](Self::decode_spikes).
    pub fn time_window(mut self, window: TimeWindow) -> Self {
        self.config.time_window = window;
        self
    }

    /// Set the selection cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the bound on feature cells held by the selection cache.
    pub fn cache_max_cells(mut self, max_cells: usize) -> Self {
        self.config.cache_max_cells = max_cells;
        self
    }

    /// Fix the sub-sampling seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Classify every row of `features` against leave-one-out templates.
    ///
    /// Row `i` of `features` belongs to row `i` of `table`.
    pub fn decode(&self, table: &TrialTable, features: &FeatureMatrix) -> Result<DecodingResult> {
        self.config.validate()?;
        let start = Instant::now();
        let grouping = self.config.grouping;

        let selectors = template_selectors(table, grouping)?;
        let mut engine = TemplateEngine::new(self.config.strategy, self.config.cache_capacity)
            .with_max_cells(self.config.cache_max_cells);
        let mut rng = rng_from_seed(self.config.seed);

        let distances = compute_distances_to_all_templates(
            features,
            &selectors,
            &mut engine,
            self.config.subsample,
            &mut rng,
        )?;
        let predictions = nearest_template_with_ties(&distances)?;

        let categories = selectors.categories().to_vec();
        let actual = table.category_indices(grouping);
        let confusion = ConfusionMatrix::with_size(categories.len(), &actual, &predictions)?;

        let result = DecodingResult {
            grouping,
            categories,
            actual,
            distances,
            predictions,
            confusion,
        };

        info!(
            trials = result.n_trials(),
            categories = result.categories.len(),
            ties = result.n_ties(),
            accuracy = result.accuracy()?,
            information_bits = result.information()?,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "Decoded trials by nearest template"
        );

        Ok(result)
    }

    /// Bin, smooth and decode raw spike trains.
    ///
    /// Uses the configured [`TimeWindow`] and [`Smoothing`]. Row `i` of
    /// `trains` belongs to row `i` of `table`.
    pub fn decode_spikes(&self, table: &TrialTable, trains: &[SpikeTrain]) -> Result<DecodingResult> {
        self.config.validate()?;
        Error::check_len("spike trains", table.len(), trains.len())?;

        let binned = bin_spikes(trains, self.config.time_window)?;
        debug!(
            trials = binned.n_trials(),
            bins = binned.n_bins(),
            "Binned spike trains"
        );
        let rates = self.config.smoothing.apply(binned.to_rates())?;
        self.decode(table, &rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TrialRecord;
    use nalgebra::DMatrix;

    fn table() -> TrialTable {
        TrialTable::new(vec![
            TrialRecord::new(0, 0, 0, 0, 0),
            TrialRecord::new(0, 0, 0, 0, 1),
            TrialRecord::new(0, 0, 1, 1, 0),
            TrialRecord::new(0, 0, 1, 1, 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_builder_sets_config() {
        let decoder = TemplateDecoder::stimulus_types()
            .metric(DistanceMetric::Manhattan)
            .cache_capacity(8)
            .cache_max_cells(1_000)
            .seed(3);
        assert_eq!(decoder.config().grouping, GroupingKey::StimulusType);
        assert_eq!(decoder.config().strategy.metric, DistanceMetric::Manhattan);
        assert_eq!(decoder.config().cache_capacity, 8);
        assert_eq!(decoder.config().cache_max_cells, 1_000);
        assert_eq!(decoder.config().seed, Some(3));
        assert_eq!(
            TemplateDecoder::full_pools().config().subsample,
            SubsamplePolicy::Disabled
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let features = DMatrix::zeros(4, 2);
        let err = TemplateDecoder::new()
            .cache_capacity(0)
            .decode(&table(), &features)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_cell_budget_rejected() {
        let features = DMatrix::zeros(4, 2);
        let err = TemplateDecoder::new()
            .cache_max_cells(0)
            .decode(&table(), &features)
            .unwrap_err();
        assert_eq!(
            err,
            Error::invalid("cache_max_cells", "must be at least 1")
        );
    }

    #[test]
    fn test_decode_spikes_length_check() {
        let trains = vec![SpikeTrain::new(vec![0.001]); 3];
        let err = TemplateDecoder::new()
            .decode_spikes(&table(), &trains)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_decode_spikes_separates_latencies() {
        // Stimulus 0 fires early, stimulus 1 late
        let trains = vec![
            SpikeTrain::new(vec![0.005, 0.006]),
            SpikeTrain::new(vec![0.005, 0.007]),
            SpikeTrain::new(vec![0.040, 0.041]),
            SpikeTrain::new(vec![0.040, 0.042]),
        ];
        let result = TemplateDecoder::new()
            .smoothing(Smoothing::Gaussian { std_ms: 2.0 })
            .time_window(TimeWindow::new(0.0, 0.050))
            .seed(1)
            .decode_spikes(&table(), &trains)
            .unwrap();
        assert!((result.accuracy().unwrap() - 1.0).abs() < 1e-12);
    }
}
