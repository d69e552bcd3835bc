//! Template construction and trial-to-template distances.

use rand::Rng;
use tracing::{debug, warn};

use super::cache::{CacheStats, SelectionCache};
use super::selectors::{Selector, SelectorTensor};
use super::strategy::TemplateStrategy;
use crate::config::SubsamplePolicy;
use crate::error::{Error, Result};
use crate::statistics::sample_without_replacement;
use crate::types::{DistanceMatrix, FeatureMatrix, Template};

/// Pools smaller than this produce noisy templates; equalizing to them is logged.
const SMALL_POOL_WARNING: usize = 3;

/// Builds templates from selected feature rows and measures distances to them.
///
/// The engine owns a [`SelectionCache`], so one instance must not be shared
/// between threads without external locking.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    strategy: TemplateStrategy,
    cache: SelectionCache,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(TemplateStrategy::default(), 4_096)
    }
}

impl TemplateEngine {
    /// Engine with the given strategy and selection-cache capacity.
    pub fn new(strategy: TemplateStrategy, cache_capacity: usize) -> Self {
        Self {
            strategy,
            cache: SelectionCache::new(cache_capacity),
        }
    }

    /// Bound the selection cache by total cached matrix cells.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.cache = self.cache.with_max_cells(max_cells);
        self
    }

    /// The summarizer / metric pair in use.
    pub fn strategy(&self) -> TemplateStrategy {
        self.strategy
    }

    /// Cache counters since the last clear.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached selections.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// One template per selector of trial `row`.
    ///
    /// When `sample_n` is set and smaller than a pool, that many rows are drawn
    /// without replacement before summarizing. The draw happens on every call;
    /// cache hits only skip re-filtering the feature matrix.
    pub fn compute_templates<R: Rng + ?Sized>(
        &mut self,
        features: &FeatureMatrix,
        selectors: &[Selector],
        sample_n: Option<usize>,
        rng: &mut R,
        row: usize,
    ) -> Result<Vec<Template>> {
        let summarizer = self.strategy.summarizer;
        let mut templates = Vec::with_capacity(selectors.len());

        for (category, selector) in selectors.iter().enumerate() {
            Error::check_len("selector mask", features.nrows(), selector.len())?;
            if selector.population() == 0 {
                return Err(Error::EmptyTemplatePool { row, category });
            }

            let pool = self.cache.select(features, selector);
            let template = match sample_n {
                Some(k) if k > 0 && k < pool.nrows() => {
                    let picked = sample_without_replacement(rng, pool.nrows(), k)
                        .ok_or_else(|| Error::invalid("sample_n", "exceeds pool size"))?;
                    summarizer.summarize(&pool.select_rows(picked.iter()))
                }
                _ => summarizer.summarize(&pool),
            };
            templates.push(template);
        }

        Ok(templates)
    }

    /// Distances from feature row `row` to each of `templates`.
    pub fn distances(&self, features: &FeatureMatrix, row: usize, templates: &[Template]) -> Vec<f64> {
        let x: Template = features.row(row).into_owned();
        templates
            .iter()
            .map(|t| self.strategy.metric.distance(&x, t))
            .collect()
    }

    /// Trial-by-category distance matrix for the whole selector tensor.
    ///
    /// The selection cache is cleared first, so entries never outlive the
    /// feature matrix they were built from.
    pub fn compute_distances<R: Rng + ?Sized>(
        &mut self,
        features: &FeatureMatrix,
        selectors: &SelectorTensor,
        policy: SubsamplePolicy,
        rng: &mut R,
    ) -> Result<DistanceMatrix> {
        self.cache.clear();
        Error::check_len("feature rows", selectors.n_rows(), features.nrows())?;
        if features.ncols() == 0 {
            return Err(Error::EmptyInput {
                what: "feature vectors",
            });
        }
        if let Some((row, category)) = selectors.first_empty() {
            return Err(Error::EmptyTemplatePool { row, category });
        }

        let sample_n = match policy {
            SubsamplePolicy::EqualizeToSmallestPool => {
                let smallest = selectors.min_population();
                if smallest < SMALL_POOL_WARNING {
                    warn!(
                        pool_size = smallest,
                        "Equalizing templates to a very small pool"
                    );
                }
                Some(smallest)
            }
            SubsamplePolicy::Disabled => None,
        };

        let n_rows = selectors.n_rows();
        let n_categories = selectors.n_categories();
        let mut out = DistanceMatrix::zeros(n_rows, n_categories);

        for row in 0..n_rows {
            let templates =
                self.compute_templates(features, selectors.row(row), sample_n, rng, row)?;
            for (category, d) in self.distances(features, row, &templates).into_iter().enumerate() {
                out[(row, category)] = d;
            }
        }

        let stats = self.cache.stats();
        debug!(
            rows = n_rows,
            categories = n_categories,
            sample_n = ?sample_n,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            cache_evictions = stats.evictions,
            "Computed distances to all templates"
        );

        Ok(out)
    }
}

/// Distance from every row to every category's leave-one-out template.
pub fn compute_distances_to_all_templates<R: Rng + ?Sized>(
    features: &FeatureMatrix,
    selectors: &SelectorTensor,
    engine: &mut TemplateEngine,
    policy: SubsamplePolicy,
    rng: &mut R,
) -> Result<DistanceMatrix> {
    engine.compute_distances(features, selectors, policy, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{GroupingKey, TrialRecord, TrialTable};
    use crate::template::{template_selectors, DistanceMetric, Summarizer};
    use nalgebra::DMatrix;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn two_by_two() -> (TrialTable, FeatureMatrix) {
        let table = TrialTable::new(vec![
            TrialRecord::new(0, 0, 0, 0, 0),
            TrialRecord::new(0, 0, 0, 0, 1),
            TrialRecord::new(0, 0, 1, 1, 0),
            TrialRecord::new(0, 0, 1, 1, 1),
        ])
        .unwrap();
        let features =
            DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0]);
        (table, features)
    }

    #[test]
    fn test_leave_one_out_distances() {
        let (table, features) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let mut engine = TemplateEngine::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

        let d = engine
            .compute_distances(&features, &tensor, SubsamplePolicy::EqualizeToSmallestPool, &mut rng)
            .unwrap();

        // Row 0's own-category template is row 1 = [0, 1]
        assert!((d[(0, 0)] - 1.0).abs() < 1e-12);
        // Row 0's other template is row 2 or 3 (pool of 2 sub-sampled to 1)
        assert!(d[(0, 1)] >= 10.0);
        assert!((d[(3, 1)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_subsampling_uses_mean() {
        let (table, features) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let mut engine = TemplateEngine::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let d = engine
            .compute_distances(&features, &tensor, SubsamplePolicy::Disabled, &mut rng)
            .unwrap();

        // Template of category 1 for row 0 is mean([10,0],[10,1]) = [10, 0.5]
        let expected = (100.0f64 + 0.25).sqrt();
        assert!((d[(0, 1)] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cache_reuses_identical_selectors() {
        let (table, features) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let mut engine = TemplateEngine::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        engine
            .compute_distances(&features, &tensor, SubsamplePolicy::Disabled, &mut rng)
            .unwrap();
        // Rows 0 and 1 share the full category-1 pool, rows 2 and 3 the category-0 pool
        assert_eq!(engine.cache_stats().hits, 2);
        assert_eq!(engine.cache_stats().misses, 6);
    }

    #[test]
    fn test_cell_budget_does_not_change_distances() {
        let (table, features) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let run = |engine: TemplateEngine| {
            let mut engine = engine;
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
            let d = engine
                .compute_distances(&features, &tensor, SubsamplePolicy::EqualizeToSmallestPool, &mut rng)
                .unwrap();
            (d, engine.cache_stats())
        };

        let (unbounded, _) = run(TemplateEngine::default());
        // Room for a single one-row pool (2 cells) only
        let (tight, stats) = run(TemplateEngine::default().with_max_cells(2));
        assert_eq!(unbounded, tight);
        assert_eq!(stats.hits + stats.misses, 8);
        assert!(stats.evictions > 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let (table, _) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let features = DMatrix::zeros(3, 2);
        let mut engine = TemplateEngine::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let err = engine
            .compute_distances(&features, &tensor, SubsamplePolicy::Disabled, &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_pool_is_error() {
        let table = TrialTable::new(vec![
            TrialRecord::new(0, 0, 0, 0, 0),
            TrialRecord::new(0, 0, 1, 1, 0),
        ])
        .unwrap();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let features = DMatrix::zeros(2, 3);
        let mut engine = TemplateEngine::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let err = engine
            .compute_distances(&features, &tensor, SubsamplePolicy::Disabled, &mut rng)
            .unwrap_err();
        assert_eq!(err, Error::EmptyTemplatePool { row: 0, category: 0 });
    }

    #[test]
    fn test_median_manhattan_strategy() {
        let (table, features) = two_by_two();
        let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
        let strategy = TemplateStrategy::new(Summarizer::Median, DistanceMetric::Manhattan);
        let mut engine = TemplateEngine::new(strategy, 16);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);

        let d = engine
            .compute_distances(&features, &tensor, SubsamplePolicy::Disabled, &mut rng)
            .unwrap();
        // median([10,0],[10,1]) = [10, 0.5]; |0-10| + |0-0.5|
        assert!((d[(0, 1)] - 10.5).abs() < 1e-12);
    }
}
