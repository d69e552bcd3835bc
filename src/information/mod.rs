//! Mutual information between stimulus category and continuous responses.
//!
//! Responses are modeled as a weighted mixture of per-category distributions
//! ([`MixtureModel`]); [`monte_carlo_mutual_information`] estimates the
//! information the response carries about the category.

mod distribution;
mod estimator;
mod mixture;

pub use distribution::{MultivariateGaussian, ResponseDistribution, UnivariateGaussian};
pub use estimator::{
    monte_carlo_mutual_information, InformationEstimate, MixtureMode, MonteCarloEstimator,
};
pub use mixture::{fit_gaussians, MixtureModel};
