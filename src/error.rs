//! Error types for the decoding and information pipeline.
//!
//! Every failure is a deterministic input-contract violation, so errors
//! propagate to the caller unchanged. [`Error::kind`] groups the variants
//! into the four families callers usually branch on.

use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Mismatched lengths or dimensions, or an empty input where data is required.
    InputShape,
    /// A label index outside `[0, n)`.
    LabelRange,
    /// Probabilities or densities that cannot be normalized.
    DegenerateDistribution,
    /// Invalid parameters, keys or permutations.
    Configuration,
}

/// Errors raised by the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Two inputs that must agree in size do not.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Which input disagreed.
        what: &'static str,
        /// Required size.
        expected: usize,
        /// Size actually supplied.
        got: usize,
    },

    /// A spike train was empty where spike times are needed to infer bounds.
    #[error("spike train at row {row} is empty; explicit time bounds are required")]
    EmptySpikeTrain {
        /// Offending row.
        row: usize,
    },

    /// Spike times were not finite and ascending.
    #[error("spike train at row {row} is not sorted ascending or contains non-finite times")]
    UnsortedSpikeTrain {
        /// Offending row.
        row: usize,
    },

    /// A leave-one-out selector picked no rows.
    #[error("template pool for row {row}, category {category} is empty")]
    EmptyTemplatePool {
        /// Trial row the template was built for.
        row: usize,
        /// Category column of the empty pool.
        category: usize,
    },

    /// An input collection was empty.
    #[error("{what} is empty")]
    EmptyInput {
        /// Which input was empty.
        what: &'static str,
    },

    /// A label index fell outside the label range.
    #[error("label {label} out of range for {n} labels")]
    LabelOutOfRange {
        /// The label supplied.
        label: usize,
        /// Number of labels.
        n: usize,
    },

    /// A probability distribution could not be formed.
    #[error("degenerate distribution: {reason}")]
    DegenerateDistribution {
        /// What made it degenerate.
        reason: String,
    },

    /// A configuration parameter was invalid.
    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A grouping key string did not name a trial-table column.
    #[error("unknown grouping key {key:?}; expected \"stim\" or \"stim_type\"")]
    UnknownGroupingKey {
        /// The rejected key.
        key: String,
    },

    /// A confusion-matrix sorter was not a permutation of the labels.
    #[error("invalid sorter: {reason}")]
    InvalidSorter {
        /// Why the permutation was rejected.
        reason: String,
    },
}

impl Error {
    /// The error family this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. }
            | Error::EmptySpikeTrain { .. }
            | Error::UnsortedSpikeTrain { .. }
            | Error::EmptyTemplatePool { .. }
            | Error::EmptyInput { .. } => ErrorKind::InputShape,
            Error::LabelOutOfRange { .. } => ErrorKind::LabelRange,
            Error::DegenerateDistribution { .. } => ErrorKind::DegenerateDistribution,
            Error::InvalidParameter { .. }
            | Error::UnknownGroupingKey { .. }
            | Error::InvalidSorter { .. } => ErrorKind::Configuration,
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Error::DegenerateDistribution {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
        if expected == got {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                what,
                expected,
                got,
            })
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
