//! Continuous response distributions usable as mixture components.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::RngCore;
use rand_distr::{Distribution, Normal, StandardNormal};
use tracing::warn;

use crate::constants::LOG_2PI;
use crate::error::{Error, Result};
use crate::statistics::add_diagonal_jitter;
use crate::types::Response;

/// A distribution that can be sampled and whose density can be evaluated.
///
/// This is the whole contract the mixture estimator relies on.
pub trait ResponseDistribution: std::fmt::Debug + Send + Sync {
    /// Dimension of the responses.
    fn dim(&self) -> usize;

    /// Draw one response.
    fn sample(&self, rng: &mut dyn RngCore) -> Response;

    /// Probability density at `x`.
    fn pdf(&self, x: &Response) -> f64;
}

/// One-dimensional normal distribution.
#[derive(Debug, Clone, Copy)]
pub struct UnivariateGaussian {
    mean: f64,
    std: f64,
    normal: Normal<f64>,
}

impl UnivariateGaussian {
    /// Normal with the given mean and (positive, finite) standard deviation.
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        if !mean.is_finite() || !(std > 0.0) || !std.is_finite() {
            return Err(Error::invalid(
                "std",
                format!("need finite mean and positive std, got N({mean}, {std})"),
            ));
        }
        let normal = Normal::new(mean, std).map_err(|e| Error::invalid("std", e.to_string()))?;
        Ok(Self { mean, std, normal })
    }

    /// Mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation.
    pub fn std(&self) -> f64 {
        self.std
    }
}

impl ResponseDistribution for UnivariateGaussian {
    fn dim(&self) -> usize {
        1
    }

    fn sample(&self, rng: &mut dyn RngCore) -> Response {
        DVector::from_element(1, self.normal.sample(rng))
    }

    fn pdf(&self, x: &Response) -> f64 {
        if x.len() != 1 {
            return 0.0;
        }
        let z = (x[0] - self.mean) / self.std;
        (-0.5 * (LOG_2PI + z * z) - self.std.ln()).exp()
    }
}

/// Multivariate normal distribution.
///
/// Singular covariances are accepted: the diagonal is regularized with a
/// small scale-adaptive jitter until a Cholesky factor exists.
#[derive(Debug, Clone)]
pub struct MultivariateGaussian {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    chol: Cholesky<f64, Dyn>,
    log_det: f64,
}

impl MultivariateGaussian {
    /// Normal with the given mean and symmetric covariance.
    pub fn new(mean: DVector<f64>, covariance: DMatrix<f64>) -> Result<Self> {
        let dim = mean.len();
        if dim == 0 {
            return Err(Error::EmptyInput {
                what: "gaussian mean",
            });
        }
        Error::check_len("covariance rows", dim, covariance.nrows())?;
        Error::check_len("covariance columns", dim, covariance.ncols())?;
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(Error::invalid("covariance", "contains non-finite values"));
        }

        let chol = match Cholesky::new(covariance.clone()) {
            Some(c) => c,
            None => {
                let (regularized, jitter) = add_diagonal_jitter(covariance.clone());
                warn!(dim, jitter, "Covariance not positive definite, adding jitter");
                Cholesky::new(regularized).ok_or_else(|| {
                    Error::degenerate("covariance is not positive semi-definite")
                })?
            }
        };
        let log_det = 2.0 * chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();

        Ok(Self {
            mean,
            covariance,
            chol,
            log_det,
        })
    }

    /// Mean vector.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Covariance as supplied (before any jitter).
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Log density at `x`.
    pub fn log_pdf(&self, x: &Response) -> f64 {
        if x.len() != self.mean.len() {
            return f64::NEG_INFINITY;
        }
        let centered = x - &self.mean;
        // Solve L * z = x - μ
        let z = match self.chol.l().solve_lower_triangular(&centered) {
            Some(z) => z,
            None => return f64::NEG_INFINITY,
        };
        let mahal_sq = z.dot(&z);
        -0.5 * (self.mean.len() as f64 * LOG_2PI + self.log_det + mahal_sq)
    }
}

impl ResponseDistribution for MultivariateGaussian {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn sample(&self, rng: &mut dyn RngCore) -> Response {
        let z: DVector<f64> =
            DVector::from_fn(self.mean.len(), |_, _| StandardNormal.sample(&mut *rng));
        &self.mean + self.chol.l() * z
    }

    fn pdf(&self, x: &Response) -> f64 {
        self.log_pdf(x).exp()
    }
}
