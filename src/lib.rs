//! # spike-info
//!
//! Template decoding and information-theoretic evaluation of spike-sorted
//! responses to auditory stimuli.
//!
//! The crate covers one analytical chain:
//! - Binning spike times on a 1 ms grid and smoothing them into rates
//! - Leave-one-out templates per stimulus (or stimulus type) and the distance
//!   of every trial to every template
//! - Nearest-template classification that keeps ties
//! - A confusion matrix with fractional tie credit, accuracy and mutual information
//!
//! A separate path estimates the mutual information between category and
//! response for a mixture of fitted distributions by Monte Carlo sampling.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spike_info::{TemplateDecoder, TrialRecord, TrialTable};
//!
//! let table = TrialTable::new(records)?;
//! let result = TemplateDecoder::new().seed(42).decode(&table, &features)?;
//!
//! println!("accuracy {:.2}", result.accuracy()?);
//! println!("information {:.3} bits", result.information()?);
//! ```
//!
//! ## Mixture information
//!
//! ```ignore
//! use spike_info::{fit_gaussians, GroupingKey, MonteCarloEstimator};
//!
//! let (_, mixture) = fit_gaussians(&table, &features, GroupingKey::Stimulus)?;
//! let estimate = MonteCarloEstimator::new().samples(20_000).seed(1).estimate(&mixture)?;
//! println!("{:.3} ± {:.3} bits", estimate.bits, estimate.standard_error);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod classify;
mod config;
mod confusion;
mod constants;
mod decoder;
mod error;
mod result;
mod table;
mod thread_pool;
mod types;

// Functional modules
pub mod information;
pub mod output;
pub mod preprocess;
pub mod statistics;
pub mod template;

// Re-exports for public API
pub use classify::nearest_template_with_ties;
pub use config::{Config, Smoothing, SubsamplePolicy, TimeWindow};
pub use confusion::{permute_symmetric, ConfusionMatrix};
pub use constants::{DENSITY_FLOOR, INFORMATION_FLOOR, NO_SPIKES_SENTINEL};
pub use decoder::TemplateDecoder;
pub use error::{Error, ErrorKind, Result};
pub use information::{
    fit_gaussians, monte_carlo_mutual_information, InformationEstimate, MixtureMode,
    MixtureModel, MonteCarloEstimator, MultivariateGaussian, ResponseDistribution,
    UnivariateGaussian,
};
pub use preprocess::{bin_spikes, conv, BinnedSpikes, SpikeTrain};
pub use result::{DecodingResult, DecodingSummary};
pub use table::{groupers, GroupingKey, TrialRecord, TrialTable};
pub use template::{
    compute_distances_to_all_templates, template_selectors, DistanceMetric, Summarizer,
    TemplateEngine, TemplateStrategy,
};
pub use types::{DistanceMatrix, FeatureMatrix, LabelSet, Response, Template};

/// Decode `features` with the default configuration.
///
/// Shorthand for `TemplateDecoder::new().decode(table, features)`.
pub fn decode(table: &TrialTable, features: &FeatureMatrix) -> Result<DecodingResult> {
    TemplateDecoder::new().decode(table, features)
}
