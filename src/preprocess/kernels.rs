//! Smoothing kernels that turn binned spikes into rate estimates.

use nalgebra::DMatrix;

use crate::config::Smoothing;
use crate::error::{Error, Result};

/// A 1-D convolution that preserves the signal length.
pub trait Convolver {
    /// The unit-sum kernel weights.
    fn kernel(&self) -> &[f64];

    /// Convolve `signal`, returning a vector of the same length.
    fn convolve(&self, signal: &[f64]) -> Vec<f64>;
}

/// Centered Gaussian kernel truncated at ±3·floor(std) samples.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    std: f64,
    half_width: usize,
    weights: Vec<f64>,
}

impl GaussianKernel {
    /// Build the kernel for a standard deviation given in samples.
    ///
    /// A standard deviation below one sample yields a single-tap identity kernel.
    pub fn new(std: f64) -> Result<Self> {
        if !(std.is_finite() && std > 0.0) {
            return Err(Error::invalid(
                "std",
                format!("must be positive and finite, got {std}"),
            ));
        }
        let half_width = 3 * std.floor() as usize;
        let two_var = 2.0 * std * std;
        let weights: Vec<f64> = (0..=2 * half_width)
            .map(|k| {
                let t = k as f64 - half_width as f64;
                (-t * t / two_var).exp()
            })
            .collect();

        Ok(Self {
            std,
            half_width,
            weights: normalize(weights),
        })
    }

    /// Standard deviation in samples.
    pub fn std(&self) -> f64 {
        self.std
    }
}

impl Convolver for GaussianKernel {
    fn kernel(&self) -> &[f64] {
        &self.weights
    }

    /// Centered ("same") convolution.
    fn convolve(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len() as isize;
        let half = self.half_width as isize;
        (0..n)
            .map(|i| {
                self.weights
                    .iter()
                    .enumerate()
                    .filter_map(|(k, w)| {
                        let j = i + half - k as isize;
                        (0..n).contains(&j).then(|| w * signal[j as usize])
                    })
                    .sum::<f64>()
            })
            .collect()
    }
}

/// Causal exponential-decay kernel spanning 4·tau samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialKernel {
    tau: f64,
    weights: Vec<f64>,
}

impl ExponentialKernel {
    /// Build the kernel for a decay constant given in samples.
    pub fn new(tau: f64) -> Result<Self> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(Error::invalid(
                "tau",
                format!("must be positive and finite, got {tau}"),
            ));
        }
        let len = ((4.0 * tau).ceil() as usize).max(1);
        let weights: Vec<f64> = (0..len).map(|t| (-(t as f64) / tau).exp()).collect();

        Ok(Self {
            tau,
            weights: normalize(weights),
        })
    }

    /// Decay constant in samples.
    pub fn tau(&self) -> f64 {
        self.tau
    }
}

impl Convolver for ExponentialKernel {
    fn kernel(&self) -> &[f64] {
        &self.weights
    }

    /// Full convolution truncated to the input length: output at `t`
    /// depends only on input at `t` and earlier.
    fn convolve(&self, signal: &[f64]) -> Vec<f64> {
        (0..signal.len())
            .map(|i| {
                self.weights
                    .iter()
                    .take(i + 1)
                    .enumerate()
                    .map(|(k, w)| w * signal[i - k])
                    .sum::<f64>()
            })
            .collect()
    }
}

fn normalize(mut weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Apply `convolver` to every row of `data` independently.
///
/// Row and column counts are preserved.
pub fn conv(data: &DMatrix<f64>, convolver: &dyn Convolver) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(data.nrows(), data.ncols());
    for (i, row) in data.row_iter().enumerate() {
        let signal: Vec<f64> = row.iter().copied().collect();
        for (j, value) in convolver.convolve(&signal).into_iter().enumerate() {
            out[(i, j)] = value;
        }
    }
    out
}

impl Smoothing {
    /// The convolver this setting describes, or `None` for no smoothing.
    pub fn convolver(&self) -> Result<Option<Box<dyn Convolver>>> {
        let convolver: Option<Box<dyn Convolver>> = match *self {
            Smoothing::None => None,
            Smoothing::Gaussian { std_ms } => Some(Box::new(GaussianKernel::new(std_ms)?)),
            Smoothing::Exponential { tau_ms } => Some(Box::new(ExponentialKernel::new(tau_ms)?)),
        };
        Ok(convolver)
    }

    /// Smooth every row of `data`, or return it unchanged for [`Smoothing::None`].
    pub fn apply(&self, data: DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(match self.convolver()? {
            Some(convolver) => conv(&data, convolver.as_ref()),
            None => data,
        })
    }
}
