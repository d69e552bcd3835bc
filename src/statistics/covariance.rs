//! Online mean and covariance estimation.
//!
//! Both accumulators use Welford's single-pass update and Chan's merge, so
//! partial results from parallel folds can be combined without storing the
//! samples.

use nalgebra::{DMatrix, DVector};

/// Online covariance accumulator for vectors of a fixed dimension.
///
/// Uses Welford's numerically stable online algorithm for mean and M2 (sum of
/// outer products), which can be converted to covariance via M2/(n-1).
#[derive(Debug, Clone)]
pub struct WelfordCovariance {
    /// Count of vectors accumulated so far.
    n: usize,
    /// Running mean of vectors.
    mean: DVector<f64>,
    /// Sum of outer products: Σ(x - μ)(x - μ)^T
    m2: DMatrix<f64>,
}

impl WelfordCovariance {
    /// Create an accumulator for vectors of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: DVector::zeros(dim),
            m2: DMatrix::zeros(dim, dim),
        }
    }

    /// Update the accumulator with a new vector.
    ///
    /// ```text
    /// δ = x - μₙ₋₁
    /// μₙ = μₙ₋₁ + δ/n
    /// δ' = x - μₙ
    /// M2ₙ = M2ₙ₋₁ + δ·δ'^T
    /// ```
    pub fn update(&mut self, x: &DVector<f64>) {
        self.n += 1;
        let n = self.n as f64;

        let delta = x - &self.mean;
        self.mean += &delta / n;
        let delta2 = x - &self.mean;
        self.m2 += &delta * delta2.transpose();
    }

    /// Return the unbiased sample covariance M2/(n-1).
    ///
    /// For n < 2, returns the identity matrix (degenerate case).
    pub fn finalize(&self) -> DMatrix<f64> {
        let dim = self.mean.len();
        if self.n < 2 {
            return DMatrix::identity(dim, dim);
        }

        &self.m2 / (self.n - 1) as f64
    }

    /// Merge another accumulator into this one using Chan's parallel algorithm.
    ///
    /// ```text
    /// n_AB = n_A + n_B
    /// δ = μ_B - μ_A
    /// μ_AB = (n_A·μ_A + n_B·μ_B) / n_AB
    /// M2_AB = M2_A + M2_B + (n_A·n_B/n_AB)·δ·δ^T
    /// ```
    pub fn merge(&mut self, other: &Self) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = other.clone();
            return;
        }

        let n_a = self.n as f64;
        let n_b = other.n as f64;
        let n_ab = n_a + n_b;

        let delta = &other.mean - &self.mean;
        self.mean = (&self.mean * n_a + &other.mean * n_b) / n_ab;

        let correction = &delta * delta.transpose() * (n_a * n_b / n_ab);
        self.m2 = &self.m2 + &other.m2 + correction;

        self.n += other.n;
    }

    /// Running mean.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Number of vectors accumulated.
    pub fn count(&self) -> usize {
        self.n
    }
}

/// Online mean and variance of a scalar stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMoments {
    n: usize,
    mean: f64,
    m2: f64,
    sum: f64,
}

impl RunningMoments {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn update(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Combine with another accumulator (Chan et al.).
    pub fn merge(mut self, other: Self) -> Self {
        if other.n == 0 {
            return self;
        }
        if self.n == 0 {
            return other;
        }
        let n_a = self.n as f64;
        let n_b = other.n as f64;
        let n_ab = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / n_ab;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n_ab;
        self.sum += other.sum;
        self.n += other.n;
        self
    }

    /// Number of observations.
    pub fn count(&self) -> usize {
        self.n
    }

    /// Sum of observations.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sample mean, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.mean)
    }

    /// Unbiased sample standard deviation (n-1 denominator), or `None` for n < 2.
    pub fn sample_std(&self) -> Option<f64> {
        (self.n > 1).then(|| (self.m2 / (self.n - 1) as f64).sqrt())
    }
}

/// Add a scale-adaptive jitter to the diagonal so the matrix admits a
/// Cholesky factorization.
///
/// Formula: ε = 10⁻¹⁰ + (tr(Σ)/d) × 10⁻⁸
pub fn add_diagonal_jitter(mut matrix: DMatrix<f64>) -> (DMatrix<f64>, f64) {
    let dim = matrix.nrows().max(1);
    let trace = matrix.trace().max(0.0);
    let jitter = 1e-10 + (trace / dim as f64) * 1e-8;

    for i in 0..matrix.nrows() {
        matrix[(i, i)] += jitter;
    }

    (matrix, jitter)
}
