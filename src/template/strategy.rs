//! How a pool of rows becomes a template, and how far a trial is from it.

use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

use crate::statistics::median;
use crate::types::{DistanceMatrix, FeatureMatrix, Template};

/// Reduces the selected rows of a template pool to one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Summarizer {
    /// Column-wise arithmetic mean.
    #[default]
    Mean,
    /// Column-wise median (R-7 interpolation for even counts).
    Median,
}

impl Summarizer {
    /// Summarize `rows` (one pool member per row) into a template.
    ///
    /// `rows` must have at least one row.
    pub fn summarize(&self, rows: &DMatrix<f64>) -> Template {
        match self {
            Summarizer::Mean => rows.row_mean(),
            Summarizer::Median => RowDVector::from_iterator(
                rows.ncols(),
                rows.column_iter().map(|column| {
                    let values: Vec<f64> = column.iter().copied().collect();
                    median(&values).unwrap_or(f64::NAN)
                }),
            ),
        }
    }
}

/// Distance between a trial's feature vector and a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// L2 norm of the difference.
    #[default]
    Euclidean,
    /// L1 norm of the difference.
    Manhattan,
    /// One minus the Pearson correlation; 1.0 when either vector is constant.
    Correlation,
}

impl DistanceMetric {
    /// Distance from `x` to `template`. Both must have the same length.
    pub fn distance(&self, x: &Template, template: &Template) -> f64 {
        match self {
            DistanceMetric::Euclidean => (template - x).norm(),
            DistanceMetric::Manhattan => (template - x).iter().map(|d| d.abs()).sum(),
            DistanceMetric::Correlation => 1.0 - pearson(x, template),
        }
    }
}

fn pearson(a: &Template, b: &Template) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

/// The summarizer / distance pair a template engine runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TemplateStrategy {
    /// How pools are summarized.
    pub summarizer: Summarizer,
    /// How trials are compared with templates.
    pub metric: DistanceMetric,
}

impl TemplateStrategy {
    /// Create a strategy from its two parts.
    pub fn new(summarizer: Summarizer, metric: DistanceMetric) -> Self {
        Self { summarizer, metric }
    }
}

/// Trial-by-trial distance matrix under `metric`.
pub fn pairwise_distances(features: &FeatureMatrix, metric: DistanceMetric) -> DistanceMatrix {
    let rows: Vec<Template> = features.row_iter().map(|r| r.into_owned()).collect();
    let n = rows.len();
    let mut out = DistanceMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(&rows[i], &rows[j]);
            out[(i, j)] = d;
            out[(j, i)] = d;
        }
    }
    out
}
