//! Configuration for template decoding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::GroupingKey;
use crate::template::{TemplateStrategy, DEFAULT_CACHE_MAX_CELLS};

/// Configuration options for [`TemplateDecoder`](crate::TemplateDecoder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trial-table column that defines the categories (default: stimulus).
    pub grouping: GroupingKey,

    /// How template pools are sub-sampled (default: equalize to the smallest pool).
    pub subsample: SubsamplePolicy,

    /// Summarizer and distance metric used for templates (default: mean / Euclidean).
    pub strategy: TemplateStrategy,

    /// Smoothing applied to binned spikes before decoding (default: Gaussian, 5 ms).
    pub smoothing: Smoothing,

    /// Time range used when binning spikes. Unset bounds are inferred from the data.
    pub time_window: TimeWindow,

    /// Maximum number of distinct selectors kept in the selection cache (default: 4,096).
    pub cache_capacity: usize,

    /// Maximum number of feature cells held by the selection cache (default: 2^24).
    pub cache_max_cells: usize,

    /// Optional deterministic seed for sub-sampling.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grouping: GroupingKey::Stimulus,
            subsample: SubsamplePolicy::EqualizeToSmallestPool,
            strategy: TemplateStrategy::default(),
            smoothing: Smoothing::Gaussian { std_ms: 5.0 },
            time_window: TimeWindow::default(),
            cache_capacity: 4_096,
            cache_max_cells: DEFAULT_CACHE_MAX_CELLS,
            seed: None,
        }
    }
}

impl Config {
    /// Check parameter ranges that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::invalid("cache_capacity", "must be at least 1"));
        }
        if self.cache_max_cells == 0 {
            return Err(Error::invalid("cache_max_cells", "must be at least 1"));
        }
        self.smoothing.validate()?;
        self.time_window.validate()
    }
}

/// Sub-sampling applied to each template pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubsamplePolicy {
    /// Draw, without replacement, as many rows as the smallest pool in the
    /// whole selector tensor so every template is built from the same count.
    #[default]
    EqualizeToSmallestPool,

    /// Summarize every selected row.
    Disabled,
}

/// Kernel used to turn binned spikes into rate estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Smoothing {
    /// Leave the binned spikes as they are.
    None,
    /// Centered Gaussian kernel with the given standard deviation in ms (bins).
    Gaussian {
        /// Standard deviation in milliseconds.
        std_ms: f64,
    },
    /// Causal exponential kernel with the given time constant in ms (bins).
    Exponential {
        /// Decay constant in milliseconds.
        tau_ms: f64,
    },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::Gaussian { std_ms: 5.0 }
    }
}

impl Smoothing {
    fn validate(&self) -> Result<()> {
        match *self {
            Smoothing::None => Ok(()),
            Smoothing::Gaussian { std_ms } if std_ms.is_finite() && std_ms > 0.0 => Ok(()),
            Smoothing::Gaussian { std_ms } => Err(Error::invalid(
                "smoothing.std_ms",
                format!("must be positive and finite, got {std_ms}"),
            )),
            Smoothing::Exponential { tau_ms } if tau_ms.is_finite() && tau_ms > 0.0 => Ok(()),
            Smoothing::Exponential { tau_ms } => Err(Error::invalid(
                "smoothing.tau_ms",
                format!("must be positive and finite, got {tau_ms}"),
            )),
        }
    }
}

/// Time range for binning, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Lower bound; inferred as the floor of the earliest spike when unset.
    pub min_s: Option<f64>,
    /// Upper bound (inclusive); inferred as the ceiling of the latest spike when unset.
    pub max_s: Option<f64>,
}

impl TimeWindow {
    /// A window with both bounds fixed.
    pub fn new(min_s: f64, max_s: f64) -> Self {
        Self {
            min_s: Some(min_s),
            max_s: Some(max_s),
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, bound) in [("time_window.min_s", self.min_s), ("time_window.max_s", self.max_s)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(Error::invalid(name, format!("must be finite, got {value}")));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_s, self.max_s) {
            if max < min {
                return Err(Error::invalid(
                    "time_window",
                    format!("max_s ({max}) is before min_s ({min})"),
                ));
            }
        }
        Ok(())
    }
}
