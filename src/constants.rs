//! Numerical constants shared across the pipeline.

/// Joint-probability cells below this absolute value contribute zero to
/// confusion-matrix information.
pub const INFORMATION_FLOOR: f64 = 1e-12;

/// Monte Carlo samples whose conditional density does not exceed this value
/// are dropped from the log-ratio sum.
pub const DENSITY_FLOOR: f64 = 1e-10;

/// Spike-time value the recording loader writes for a trial with no spikes.
pub const NO_SPIKES_SENTINEL: f64 = -999.0;

/// Milliseconds per second; bins are 1 ms wide.
pub const MS_PER_SECOND: f64 = 1e3;

/// Slack (in ms) absorbed when snapping spike times to bin edges.
pub const BIN_EDGE_TOLERANCE_MS: f64 = 1e-6;

/// ln(2π), used by Gaussian log densities.
pub const LOG_2PI: f64 = 1.8378770664093453;
