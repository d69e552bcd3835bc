//! Type aliases and common types.

use nalgebra::{DMatrix, DVector, RowDVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-trial feature vectors, one row per trial.
pub type FeatureMatrix = DMatrix<f64>;

/// Trial-by-category distances to templates.
pub type DistanceMatrix = DMatrix<f64>;

/// A summary vector built from a pool of feature rows.
pub type Template = RowDVector<f64>;

/// A point in response space for the mixture estimator.
pub type Response = DVector<f64>;

/// Non-empty, sorted, duplicate-free set of category indices.
///
/// A single prediction is a set of size one; a tie between `k` nearest
/// templates is a set of size `k`, each member receiving `1/k` credit.
///
/// Serializes as a plain label list; deserialization goes through
/// [`LabelSet::from_labels`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct LabelSet(Vec<usize>);

impl LabelSet {
    /// A set holding exactly one label.
    pub fn single(label: usize) -> Self {
        LabelSet(vec![label])
    }

    /// Build a set from possibly unsorted, possibly repeated labels.
    ///
    /// Fails if no label is given.
    pub fn from_labels<I: IntoIterator<Item = usize>>(labels: I) -> Result<Self> {
        let mut labels: Vec<usize> = labels.into_iter().collect();
        if labels.is_empty() {
            return Err(Error::EmptyInput {
                what: "predicted label set",
            });
        }
        labels.sort_unstable();
        labels.dedup();
        Ok(LabelSet(labels))
    }

    /// The labels in ascending order.
    pub fn labels(&self) -> &[usize] {
        &self.0
    }

    /// Number of tied labels (at least one).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the prediction is a tie.
    pub fn is_tie(&self) -> bool {
        self.0.len() > 1
    }

    /// Whether `label` is a member.
    pub fn contains(&self, label: usize) -> bool {
        self.0.binary_search(&label).is_ok()
    }

    /// Credit each member receives.
    pub fn weight(&self) -> f64 {
        1.0 / self.0.len() as f64
    }
}

impl TryFrom<Vec<usize>> for LabelSet {
    type Error = Error;

    fn try_from(labels: Vec<usize>) -> Result<Self> {
        LabelSet::from_labels(labels)
    }
}

impl From<LabelSet> for Vec<usize> {
    fn from(set: LabelSet) -> Self {
        set.0
    }
}

impl From<usize> for LabelSet {
    fn from(label: usize) -> Self {
        LabelSet::single(label)
    }
}
