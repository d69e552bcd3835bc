//! Trial tables produced by the recording loader.
//!
//! Each row identifies one presentation of one stimulus to one unit. The
//! table is read-only once built; the pipeline derives category labels,
//! masks and sorters from it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One trial row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Recording electrode id.
    pub electrode: i32,
    /// Spike-sorted unit id on that electrode.
    pub unit: i32,
    /// Stimulus index.
    pub stim: u32,
    /// Stimulus-type index (call type); fixed for a given stimulus.
    pub stim_type: u32,
    /// Trial (repeat) index for this stimulus.
    pub trial: u32,
}

impl TrialRecord {
    /// Create a record.
    pub fn new(electrode: i32, unit: i32, stim: u32, stim_type: u32, trial: u32) -> Self {
        Self {
            electrode,
            unit,
            stim,
            stim_type,
            trial,
        }
    }
}

/// Column used to group trials into categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GroupingKey {
    /// Group by individual stimulus.
    #[default]
    Stimulus,
    /// Group by stimulus type.
    StimulusType,
}

impl GroupingKey {
    /// The category value of `record` under this key.
    pub fn label(self, record: &TrialRecord) -> u32 {
        match self {
            GroupingKey::Stimulus => record.stim,
            GroupingKey::StimulusType => record.stim_type,
        }
    }
}

impl FromStr for GroupingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stim" | "stimulus" => Ok(GroupingKey::Stimulus),
            "stim_type" | "stimulus_type" => Ok(GroupingKey::StimulusType),
            other => Err(Error::UnknownGroupingKey {
                key: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKey::Stimulus => write!(f, "stim"),
            GroupingKey::StimulusType => write!(f, "stim_type"),
        }
    }
}

/// Ordered collection of trial records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "TrialTableRepr")]
pub struct TrialTable {
    records: Vec<TrialRecord>,
}

/// Unchecked serde form of [`TrialTable`].
#[derive(Deserialize)]
struct TrialTableRepr {
    records: Vec<TrialRecord>,
}

impl TryFrom<TrialTableRepr> for TrialTable {
    type Error = Error;

    fn try_from(repr: TrialTableRepr) -> Result<Self> {
        TrialTable::new(repr.records)
    }
}

impl TrialTable {
    /// Build a table, checking that every stimulus maps to exactly one stimulus type.
    pub fn new(records: Vec<TrialRecord>) -> Result<Self> {
        let mut stim_types: HashMap<u32, u32> = HashMap::new();
        for record in &records {
            let known = *stim_types.entry(record.stim).or_insert(record.stim_type);
            if known != record.stim_type {
                return Err(Error::invalid(
                    "stim_type",
                    format!(
                        "stimulus {} appears with types {} and {}",
                        record.stim, known, record.stim_type
                    ),
                ));
            }
        }
        Ok(Self { records })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All rows in order.
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &TrialRecord> {
        self.records.iter()
    }

    /// Category value of every row.
    pub fn labels(&self, key: GroupingKey) -> Vec<u32> {
        self.records.iter().map(|r| key.label(r)).collect()
    }

    /// Distinct category values, ascending.
    pub fn categories(&self, key: GroupingKey) -> Vec<u32> {
        let mut values = self.labels(key);
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Index of every row's category within [`categories`](Self::categories).
    ///
    /// This is the actual-label sequence fed to the confusion matrix.
    pub fn category_indices(&self, key: GroupingKey) -> Vec<usize> {
        let categories = self.categories(key);
        self.records
            .iter()
            .map(|r| {
                categories
                    .binary_search(&key.label(r))
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Permutation of the sorted stimuli that places stimuli of the same
    /// type next to each other.
    ///
    /// Intended for [`ConfusionMatrix::set_sorter`](crate::ConfusionMatrix::set_sorter)
    /// when grouping by stimulus. Stimuli sharing a type keep their ascending order.
    pub fn stimulus_sorter(&self) -> Vec<usize> {
        let mut pairs: Vec<(u32, u32)> = self.records.iter().map(|r| (r.stim, r.stim_type)).collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut sorter: Vec<usize> = (0..pairs.len()).collect();
        sorter.sort_by_key(|&i| pairs[i].1);
        sorter
    }

    /// Rows recorded from one (electrode, unit) pair, with their original indices.
    pub fn filter_unit(&self, electrode: i32, unit: i32) -> (TrialTable, Vec<usize>) {
        let (kept, records): (Vec<usize>, Vec<TrialRecord>) = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.electrode == electrode && r.unit == unit)
            .map(|(i, r)| (i, *r))
            .unzip();
        (TrialTable { records }, kept)
    }
}

/// Partition row indices by a categorical column.
///
/// Returns one `(value, mask)` pair per distinct value, in ascending value
/// order, where `mask[i]` is true when `column[i] == value`.
pub fn groupers<T: Ord + Copy>(column: &[T]) -> Vec<(T, Vec<bool>)> {
    let mut values = column.to_vec();
    values.sort_unstable();
    values.dedup();
    values
        .into_iter()
        .map(|value| (value, column.iter().map(|&c| c == value).collect()))
        .collect()
}
