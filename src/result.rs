//! Decoding result types.

use serde::{Deserialize, Serialize};

use crate::confusion::ConfusionMatrix;
use crate::error::Result;
use crate::table::GroupingKey;
use crate::types::{DistanceMatrix, LabelSet};

/// Everything produced by one run of [`TemplateDecoder`](crate::TemplateDecoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodingResult {
    /// Column that defined the categories.
    pub grouping: GroupingKey,

    /// Category values; distance column and confusion label `c` refer to `categories[c]`.
    pub categories: Vec<u32>,

    /// Each trial's actual category index.
    pub actual: Vec<usize>,

    /// Trial-by-category distances to leave-one-out templates.
    pub distances: DistanceMatrix,

    /// Nearest-template labels per trial, ties kept.
    pub predictions: Vec<LabelSet>,

    /// Actual vs. predicted counts.
    pub confusion: ConfusionMatrix,
}

impl DecodingResult {
    /// Number of decoded trials.
    pub fn n_trials(&self) -> usize {
        self.actual.len()
    }

    /// Trials whose prediction was a tie.
    pub fn n_ties(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_tie()).count()
    }

    /// Fraction of joint mass on correct predictions.
    pub fn accuracy(&self) -> Result<f64> {
        self.confusion.accuracy()
    }

    /// Mutual information between actual and predicted category, in bits.
    pub fn information(&self) -> Result<f64> {
        self.confusion.information()
    }

    /// Condensed, serializable view of the run.
    pub fn summary(&self) -> Result<DecodingSummary> {
        let counts = self.confusion.matrix();
        Ok(DecodingSummary {
            grouping: self.grouping,
            categories: self.categories.clone(),
            n_trials: self.n_trials(),
            n_ties: self.n_ties(),
            accuracy: self.accuracy()?,
            information_bits: self.information()?,
            chance_accuracy: 1.0 / self.categories.len().max(1) as f64,
            max_information_bits: (self.categories.len().max(1) as f64).log2(),
            confusion: counts.row_iter().map(|r| r.iter().copied().collect()).collect(),
        })
    }
}

/// Headline numbers of a decoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingSummary {
    /// Column that defined the categories.
    pub grouping: GroupingKey,

    /// Category values in label order.
    pub categories: Vec<u32>,

    /// Number of decoded trials.
    pub n_trials: usize,

    /// Trials whose nearest template was tied.
    pub n_ties: usize,

    /// Fraction of correct predictions (ties give fractional credit).
    pub accuracy: f64,

    /// Mutual information between actual and predicted category, in bits.
    pub information_bits: f64,

    /// Accuracy of uniform guessing, `1 / n_categories`.
    pub chance_accuracy: f64,

    /// Upper bound on the information, `log2(n_categories)`.
    pub max_information_bits: f64,

    /// Confusion counts, row per actual category (sorter applied).
    pub confusion: Vec<Vec<f64>>,
}
