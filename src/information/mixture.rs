//! Weighted mixtures of response distributions, and fitting one Gaussian per category.

use std::sync::Arc;

use tracing::{debug, warn};

use super::distribution::{MultivariateGaussian, ResponseDistribution};
use crate::error::{Error, Result};
use crate::statistics::WelfordCovariance;
use crate::table::{GroupingKey, TrialTable};
use crate::types::{FeatureMatrix, Response};

/// Category-conditional distributions with normalized prior weights.
#[derive(Debug, Clone)]
pub struct MixtureModel {
    components: Vec<Arc<dyn ResponseDistribution>>,
    weights: Vec<f64>,
}

impl MixtureModel {
    /// Mixture of `components` weighted by `weights` (normalized here).
    ///
    /// Weights must be finite, non-negative and not all zero.
    pub fn new(components: Vec<Arc<dyn ResponseDistribution>>, weights: Vec<f64>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::EmptyInput {
                what: "mixture components",
            });
        }
        Error::check_len("mixture weights", components.len(), weights.len())?;
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::invalid(
                "weights",
                "must be finite and non-negative",
            ));
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return Err(Error::degenerate("mixture weights sum to zero"));
        }

        let dim = components[0].dim();
        for c in &components[1..] {
            Error::check_len("component dimension", dim, c.dim())?;
        }

        Ok(Self {
            components,
            weights: weights.into_iter().map(|w| w / total).collect(),
        })
    }

    /// Mixture with equal weights.
    pub fn uniform(components: Vec<Arc<dyn ResponseDistribution>>) -> Result<Self> {
        let weights = vec![1.0; components.len()];
        Self::new(components, weights)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false for a constructed mixture.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Normalized weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Component for category `c`.
    pub fn component(&self, c: usize) -> Option<&dyn ResponseDistribution> {
        self.components.get(c).map(|d| d.as_ref())
    }

    /// Response dimension shared by every component.
    pub fn dim(&self) -> usize {
        self.components[0].dim()
    }

    /// Mixture density `Σ_c p(c) p(x | c)`.
    pub fn density(&self, x: &Response) -> f64 {
        self.components
            .iter()
            .zip(&self.weights)
            .map(|(d, w)| w * d.pdf(x))
            .sum()
    }

    /// Mixture density with category `excluded` removed and the remaining
    /// weights renormalized. `None` when no weight remains.
    pub fn density_excluding(&self, x: &Response, excluded: usize) -> Option<f64> {
        let remaining: f64 = self
            .weights
            .iter()
            .enumerate()
            .filter(|&(c, _)| c != excluded)
            .map(|(_, w)| w)
            .sum();
        if !(remaining > 0.0) {
            return None;
        }
        let density: f64 = self
            .components
            .iter()
            .zip(&self.weights)
            .enumerate()
            .filter(|&(c, _)| c != excluded)
            .map(|(_, (d, w))| w * d.pdf(x))
            .sum();
        Some(density / remaining)
    }
}

/// Fit one multivariate Gaussian per category of `key`.
///
/// Means and unbiased covariances come from the feature rows of each category;
/// weights are proportional to the category row counts. Categories with fewer
/// than two rows get an identity covariance.
pub fn fit_gaussians(
    table: &TrialTable,
    features: &FeatureMatrix,
    key: GroupingKey,
) -> Result<(Vec<u32>, MixtureModel)> {
    if table.is_empty() {
        return Err(Error::EmptyInput {
            what: "trial table",
        });
    }
    Error::check_len("feature rows", table.len(), features.nrows())?;

    let dim = features.ncols();
    let categories = table.categories(key);
    let labels = table.category_indices(key);
    let mut accumulators = vec![WelfordCovariance::new(dim); categories.len()];
    for (row, &label) in labels.iter().enumerate() {
        accumulators[label].update(&features.row(row).transpose());
    }

    let mut components: Vec<Arc<dyn ResponseDistribution>> = Vec::with_capacity(categories.len());
    let mut weights = Vec::with_capacity(categories.len());
    for (category, acc) in categories.iter().zip(&accumulators) {
        if acc.count() < 2 {
            warn!(
                category,
                rows = acc.count(),
                "Too few rows for a covariance estimate, using identity"
            );
        }
        components.push(Arc::new(MultivariateGaussian::new(
            acc.mean().clone(),
            acc.finalize(),
        )?));
        weights.push(acc.count() as f64);
    }

    debug!(categories = categories.len(), dim, "Fitted Gaussian mixture");
    Ok((categories, MixtureModel::new(components, weights)?))
}
