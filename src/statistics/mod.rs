//! Statistical building blocks.
//!
//! - Quantiles via O(n) selection (median summaries)
//! - Online mean/covariance accumulators (Gaussian fitting, Monte Carlo moments)
//! - Seeded sampling helpers (sub-sampling, per-sample RNG streams)

mod covariance;
mod quantile;
mod sampling;

pub use covariance::{add_diagonal_jitter, RunningMoments, WelfordCovariance};
pub use quantile::{compute_quantile, median};
pub use sampling::{counter_rng_seed, rng_from_seed, sample_without_replacement};
