//! Nearest-template classification.

use crate::error::{Error, Result};
use crate::types::{DistanceMatrix, LabelSet};

/// For each row of `distances`, the set of all columns at the row minimum.
///
/// Ties are kept: every column whose distance equals the minimum exactly is
/// a member. NaN entries are ignored; a row with no comparable entry is a
/// degenerate input.
pub fn nearest_template_with_ties(distances: &DistanceMatrix) -> Result<Vec<LabelSet>> {
    if distances.ncols() == 0 {
        return Err(Error::EmptyInput {
            what: "distance matrix columns",
        });
    }

    distances
        .row_iter()
        .enumerate()
        .map(|(row, d)| {
            let min = d
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .fold(f64::INFINITY, f64::min);
            if d.iter().all(|v| v.is_nan()) {
                return Err(Error::degenerate(format!(
                    "row {row} has no comparable distance"
                )));
            }
            LabelSet::from_labels(
                d.iter()
                    .enumerate()
                    .filter_map(|(col, &v)| (v == min).then_some(col)),
            )
        })
        .collect()
}
