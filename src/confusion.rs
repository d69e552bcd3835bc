//! Confusion matrix with fractional tie credit and the quantities derived from it.
//!
//! Rows are actual labels, columns predicted labels. A trial whose prediction
//! ties `k` labels adds `1/k` to each of the `k` cells, so every trial carries
//! a total weight of exactly one.
//!
//! An optional sorter relabels both axes on read. Stored counts are never
//! permuted, so [`ConfusionMatrix::counts`] always returns construction order.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::constants::INFORMATION_FLOOR;
use crate::error::{Error, Result};
use crate::types::LabelSet;

/// Square count matrix of actual vs. predicted labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfusionMatrixRepr")]
pub struct ConfusionMatrix {
    counts: DMatrix<f64>,
    sorter: Option<Vec<usize>>,
}

/// Unchecked serde form of [`ConfusionMatrix`].
#[derive(Deserialize)]
struct ConfusionMatrixRepr {
    counts: DMatrix<f64>,
    sorter: Option<Vec<usize>>,
}

impl TryFrom<ConfusionMatrixRepr> for ConfusionMatrix {
    type Error = Error;

    fn try_from(repr: ConfusionMatrixRepr) -> Result<Self> {
        let ConfusionMatrixRepr { counts, sorter } = repr;
        Error::check_len("confusion columns", counts.nrows(), counts.ncols())?;
        if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(Error::invalid(
                "counts",
                "must be finite and non-negative",
            ));
        }
        if let Some(permutation) = &sorter {
            validate_permutation(permutation, counts.nrows())?;
        }
        Ok(Self { counts, sorter })
    }
}

impl ConfusionMatrix {
    /// Accumulate `actual` / `predicted` pairs.
    ///
    /// The matrix size is the number of distinct actual labels; every label,
    /// actual or predicted, must be below it.
    pub fn new(actual: &[usize], predicted: &[LabelSet]) -> Result<Self> {
        let mut distinct = actual.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        Self::with_size(distinct.len(), actual, predicted)
    }

    /// Accumulate pairs into an `n × n` matrix.
    pub fn with_size(n: usize, actual: &[usize], predicted: &[LabelSet]) -> Result<Self> {
        Error::check_len("predicted labels", actual.len(), predicted.len())?;
        if actual.is_empty() {
            return Err(Error::EmptyInput {
                what: "actual labels",
            });
        }

        let mut counts = DMatrix::zeros(n, n);
        for (&a, p) in actual.iter().zip(predicted) {
            if a >= n {
                return Err(Error::LabelOutOfRange { label: a, n });
            }
            let weight = p.weight();
            for &label in p.labels() {
                if label >= n {
                    return Err(Error::LabelOutOfRange { label, n });
                }
                counts[(a, label)] += weight;
            }
        }

        Ok(Self {
            counts,
            sorter: None,
        })
    }

    /// Number of labels along each axis.
    pub fn n(&self) -> usize {
        self.counts.nrows()
    }

    /// Reorder both axes by `permutation` on every read.
    ///
    /// `permutation[k]` is the stored label shown at position `k`.
    pub fn set_sorter(&mut self, permutation: Vec<usize>) -> Result<()> {
        validate_permutation(&permutation, self.n())?;
        self.sorter = Some(permutation);
        Ok(())
    }

    /// Builder form of [`set_sorter`](Self::set_sorter).
    pub fn with_sorter(mut self, permutation: Vec<usize>) -> Result<Self> {
        self.set_sorter(permutation)?;
        Ok(self)
    }

    /// Return to construction order.
    pub fn clear_sorter(&mut self) {
        self.sorter = None;
    }

    /// The current sorter, if any.
    pub fn sorter(&self) -> Option<&[usize]> {
        self.sorter.as_deref()
    }

    /// Stored counts in construction order, ignoring the sorter.
    pub fn counts(&self) -> &DMatrix<f64> {
        &self.counts
    }

    /// Counts with the sorter applied to both axes.
    pub fn matrix(&self) -> DMatrix<f64> {
        match &self.sorter {
            Some(p) => permute_symmetric(&self.counts, p),
            None => self.counts.clone(),
        }
    }

    /// Total weight, equal to the number of trials accumulated.
    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Joint probabilities `P(actual, predicted)`.
    pub fn p_xy(&self) -> Result<DMatrix<f64>> {
        let total = self.total();
        if !(total > 0.0) {
            return Err(Error::degenerate("confusion matrix has zero total count"));
        }
        Ok(self.matrix() / total)
    }

    /// Marginal over actual labels (row sums of [`p_xy`](Self::p_xy)).
    pub fn p_x(&self) -> Result<DVector<f64>> {
        Ok(row_sums(&self.p_xy()?))
    }

    /// Marginal over predicted labels (column sums of [`p_xy`](Self::p_xy)).
    pub fn p_y(&self) -> Result<DVector<f64>> {
        Ok(column_sums(&self.p_xy()?))
    }

    /// `P(predicted | actual = i)`, row `i` of the sorted view normalized to one.
    pub fn p_x_cond(&self, i: usize) -> Result<DVector<f64>> {
        let n = self.n();
        if i >= n {
            return Err(Error::LabelOutOfRange { label: i, n });
        }
        let row: DVector<f64> = self.p_xy()?.row(i).transpose();
        normalize(row, || format!("actual label {i} has no mass"))
    }

    /// `P(actual | predicted = j)`, column `j` of the sorted view normalized to one.
    pub fn p_y_cond(&self, j: usize) -> Result<DVector<f64>> {
        let n = self.n();
        if j >= n {
            return Err(Error::LabelOutOfRange { label: j, n });
        }
        let column: DVector<f64> = self.p_xy()?.column(j).into_owned();
        normalize(column, || format!("predicted label {j} has no mass"))
    }

    /// Fraction of joint mass on the diagonal.
    pub fn accuracy(&self) -> Result<f64> {
        Ok(self.p_xy()?.trace())
    }

    /// Mutual information between actual and predicted labels, in bits.
    ///
    /// Cells with joint probability below `1e-12` contribute nothing.
    pub fn information(&self) -> Result<f64> {
        let p_xy = self.p_xy()?;
        let p_x = row_sums(&p_xy);
        let p_y = column_sums(&p_xy);

        let mut bits = 0.0;
        for j in 0..p_xy.ncols() {
            for i in 0..p_xy.nrows() {
                let p = p_xy[(i, j)];
                if p >= INFORMATION_FLOOR {
                    bits += p * (p / (p_x[i] * p_y[j])).log2();
                }
            }
        }
        Ok(bits)
    }
}

/// `out[i][j] = matrix[p[i]][p[j]]` for a square matrix.
///
/// Panics if `permutation` references indices outside the matrix.
pub fn permute_symmetric(matrix: &DMatrix<f64>, permutation: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(permutation.len(), permutation.len(), |i, j| {
        matrix[(permutation[i], permutation[j])]
    })
}

fn validate_permutation(permutation: &[usize], n: usize) -> Result<()> {
    if permutation.len() != n {
        return Err(Error::InvalidSorter {
            reason: format!("expected {n} entries, got {}", permutation.len()),
        });
    }
    let mut seen = vec![false; n];
    for &p in permutation {
        if p >= n || seen[p] {
            return Err(Error::InvalidSorter {
                reason: format!("{permutation:?} is not a permutation of 0..{n}"),
            });
        }
        seen[p] = true;
    }
    Ok(())
}

fn row_sums(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.nrows(), m.row_iter().map(|r| r.sum()))
}

fn column_sums(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.ncols(), m.column_iter().map(|c| c.sum()))
}

fn normalize(v: DVector<f64>, reason: impl FnOnce() -> String) -> Result<DVector<f64>> {
    let sum = v.sum();
    if !(sum > 0.0) {
        return Err(Error::degenerate(reason()));
    }
    Ok(v / sum)
}
