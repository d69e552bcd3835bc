//! Spike-train preprocessing.
//!
//! - Binning spike times onto a shared 1 ms grid ([`bin_spikes`])
//! - Gaussian and exponential smoothing into rate estimates ([`conv`])

mod binning;
mod kernels;

pub use binning::{bin_spikes, BinnedSpikes, SpikeTrain};
pub use kernels::{conv, Convolver, ExponentialKernel, GaussianKernel};
