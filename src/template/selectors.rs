//! Leave-one-out selectors over a trial table.
//!
//! For every trial row and every category, a selector marks the rows whose
//! features go into that category's template when classifying the row. A
//! row's own (stimulus, trial) pair is always excluded, whichever column the
//! categories come from.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::{groupers, GroupingKey, TrialTable};

/// Boolean mask over table rows identifying one template pool.
///
/// Equality and hashing compare the mask by value, which is what the
/// selection cache keys on. Serializes as the bare mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<bool>", into = "Vec<bool>")]
pub struct Selector {
    mask: Vec<bool>,
    population: usize,
}

impl Selector {
    /// Wrap a mask.
    pub fn from_mask(mask: Vec<bool>) -> Self {
        let population = mask.iter().filter(|&&m| m).count();
        Self { mask, population }
    }

    /// The mask, one entry per table row.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Whether row `i` is in the pool.
    pub fn contains(&self, i: usize) -> bool {
        self.mask.get(i).copied().unwrap_or(false)
    }

    /// Number of selected rows.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Length of the mask (number of table rows).
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    /// Whether the mask has no entries.
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Indices of the selected rows, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
            .collect()
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Selector::from_mask(mask)
    }
}

impl From<Selector> for Vec<bool> {
    fn from(selector: Selector) -> Self {
        selector.mask
    }
}

/// Selectors for every (row, category) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SelectorTensorRepr")]
pub struct SelectorTensor {
    n_rows: usize,
    categories: Vec<u32>,
    /// Row-major: `selectors[row * n_categories + category]`.
    selectors: Vec<Selector>,
}

/// Unchecked serde form of [`SelectorTensor`].
#[derive(Deserialize)]
struct SelectorTensorRepr {
    n_rows: usize,
    categories: Vec<u32>,
    selectors: Vec<Selector>,
}

impl TryFrom<SelectorTensorRepr> for SelectorTensor {
    type Error = Error;

    fn try_from(repr: SelectorTensorRepr) -> Result<Self> {
        let SelectorTensorRepr {
            n_rows,
            categories,
            selectors,
        } = repr;
        if categories.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid(
                "categories",
                "must be strictly ascending",
            ));
        }
        let expected = n_rows
            .checked_mul(categories.len())
            .ok_or_else(|| Error::invalid("n_rows", "selector count overflows"))?;
        Error::check_len("selectors", expected, selectors.len())?;
        for selector in &selectors {
            Error::check_len("selector mask", n_rows, selector.len())?;
        }
        Ok(Self {
            n_rows,
            categories,
            selectors,
        })
    }
}

impl SelectorTensor {
    /// Number of table rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of categories.
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    /// Category values in ascending order; column `c` corresponds to `categories()[c]`.
    pub fn categories(&self) -> &[u32] {
        &self.categories
    }

    /// Selector for `row` and category column `category`.
    pub fn get(&self, row: usize, category: usize) -> Option<&Selector> {
        if row >= self.n_rows || category >= self.categories.len() {
            return None;
        }
        self.selectors.get(row * self.categories.len() + category)
    }

    /// All selectors of one row, in category order.
    pub fn row(&self, row: usize) -> &[Selector] {
        let n = self.categories.len();
        &self.selectors[row * n..(row + 1) * n]
    }

    /// Smallest pool size over the whole tensor.
    pub fn min_population(&self) -> usize {
        self.selectors
            .iter()
            .map(Selector::population)
            .min()
            .unwrap_or(0)
    }

    /// First (row, category) whose pool is empty, if any.
    pub fn first_empty(&self) -> Option<(usize, usize)> {
        let n = self.categories.len();
        self.selectors
            .iter()
            .position(|s| s.population() == 0)
            .map(|i| (i / n, i % n))
    }
}

/// Build leave-one-out selectors for every row of `table`.
///
/// Entry `(r, c)` selects the rows of category `c` (under `key`) except those
/// sharing row `r`'s stimulus *and* trial.
pub fn template_selectors(table: &TrialTable, key: GroupingKey) -> Result<SelectorTensor> {
    if table.is_empty() {
        return Err(Error::EmptyInput {
            what: "trial table",
        });
    }

    let records = table.records();
    let groups = groupers(&table.labels(key));
    let categories: Vec<u32> = groups.iter().map(|(value, _)| *value).collect();

    let mut selectors = Vec::with_capacity(records.len() * groups.len());
    for row in records {
        for (_, group) in &groups {
            let mask = group
                .iter()
                .zip(records)
                .map(|(&in_group, other)| {
                    in_group && (other.stim != row.stim || other.trial != row.trial)
                })
                .collect();
            selectors.push(Selector::from_mask(mask));
        }
    }

    Ok(SelectorTensor {
        n_rows: records.len(),
        categories,
        selectors,
    })
}
