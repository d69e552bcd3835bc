//! Spike-time binning at 1 ms resolution.
//!
//! Spike trains arrive as timestamps in seconds. Binning maps every train
//! onto a shared grid of millisecond bins so that rows are directly
//! comparable; all rows always share identical bin boundaries.

use nalgebra::DMatrix;

use crate::config::TimeWindow;
use crate::constants::{BIN_EDGE_TOLERANCE_MS, MS_PER_SECOND, NO_SPIKES_SENTINEL};
use crate::error::{Error, Result};

/// Spike timestamps (seconds) of one unit on one trial.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpikeTrain {
    times: Vec<f64>,
}

impl SpikeTrain {
    /// Wrap timestamps as given. Ordering is checked when the train is binned.
    pub fn new(times: Vec<f64>) -> Self {
        Self { times }
    }

    /// Wrap timestamps read from a recording, mapping the loader's
    /// no-spike sentinel (`[-999]`) to an empty train.
    pub fn from_recorded(times: Vec<f64>) -> Self {
        match times.first() {
            Some(&t) if t == NO_SPIKES_SENTINEL => Self::default(),
            _ => Self { times },
        }
    }

    /// Spike times in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of spikes.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the train has no spikes.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Whether all times are finite and non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.times.iter().all(|t| t.is_finite()) && self.times.windows(2).all(|w| w[0] <= w[1])
    }
}

impl From<Vec<f64>> for SpikeTrain {
    fn from(times: Vec<f64>) -> Self {
        SpikeTrain::new(times)
    }
}

/// Binary spike matrix on a shared millisecond grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSpikes {
    /// Bin start times in seconds, one per column, spaced exactly 1 ms apart.
    pub time_axis: Vec<f64>,
    /// Rows are trials, columns are bins; a cell is 1 if any spike fell in the bin.
    pub spikes: DMatrix<u8>,
}

impl BinnedSpikes {
    /// Number of rows (trials).
    pub fn n_trials(&self) -> usize {
        self.spikes.nrows()
    }

    /// Number of 1 ms bins.
    pub fn n_bins(&self) -> usize {
        self.spikes.ncols()
    }

    /// The spike matrix as floating-point rates, ready for smoothing.
    pub fn to_rates(&self) -> DMatrix<f64> {
        self.spikes.map(f64::from)
    }
}

fn floor_ms(ms: f64) -> i64 {
    (ms + BIN_EDGE_TOLERANCE_MS).floor() as i64
}

fn ceil_ms(ms: f64) -> i64 {
    (ms - BIN_EDGE_TOLERANCE_MS).ceil() as i64
}

/// Convert spike trains into a binary spike matrix with 1 ms bins.
///
/// Bounds come from `window` when set. Otherwise the lower bound is the floor
/// of the earliest first spike and the upper bound the ceiling of the latest
/// last spike (in ms), which requires every train to be non-empty.
///
/// Both bounds are inclusive: the matrix has `max_ms - min_ms + 1` columns, so
/// a spike at exactly `max` lands in the last column. Several spikes in one bin
/// still give a single 1.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if `trains` is empty.
/// - [`Error::UnsortedSpikeTrain`] if a train is not finite and ascending.
/// - [`Error::EmptySpikeTrain`] if a bound must be inferred and a train is empty.
/// - [`Error::InvalidParameter`] if the upper bound precedes the lower one.
pub fn bin_spikes(trains: &[SpikeTrain], window: TimeWindow) -> Result<BinnedSpikes> {
    if trains.is_empty() {
        return Err(Error::EmptyInput {
            what: "spike trains",
        });
    }
    for (row, train) in trains.iter().enumerate() {
        if !train.is_sorted() {
            return Err(Error::UnsortedSpikeTrain { row });
        }
    }

    let min_ms = match window.min_s {
        Some(s) => floor_ms(s * MS_PER_SECOND),
        None => infer_bound(trains, |times| floor_ms(times[0] * MS_PER_SECOND), i64::min)?,
    };
    let max_ms = match window.max_s {
        Some(s) => floor_ms(s * MS_PER_SECOND),
        None => infer_bound(
            trains,
            |times| ceil_ms(times[times.len() - 1] * MS_PER_SECOND),
            i64::max,
        )?,
    };

    if max_ms < min_ms {
        return Err(Error::invalid(
            "time_window",
            format!("max ({max_ms} ms) is before min ({min_ms} ms)"),
        ));
    }

    let n_bins = (max_ms - min_ms + 1) as usize;
    let mut spikes = DMatrix::<u8>::zeros(trains.len(), n_bins);

    for (row, train) in trains.iter().enumerate() {
        for &t in train.times() {
            let bin = floor_ms(t * MS_PER_SECOND);
            if (min_ms..=max_ms).contains(&bin) {
                spikes[(row, (bin - min_ms) as usize)] = 1;
            }
        }
    }

    let time_axis = (0..n_bins)
        .map(|k| (min_ms + k as i64) as f64 / MS_PER_SECOND)
        .collect();

    Ok(BinnedSpikes { time_axis, spikes })
}

fn infer_bound(
    trains: &[SpikeTrain],
    edge: impl Fn(&[f64]) -> i64,
    combine: fn(i64, i64) -> i64,
) -> Result<i64> {
    let mut bound: Option<i64> = None;
    for (row, train) in trains.iter().enumerate() {
        if train.is_empty() {
            return Err(Error::EmptySpikeTrain { row });
        }
        let value = edge(train.times());
        bound = Some(bound.map_or(value, |b| combine(b, value)));
    }
    bound.ok_or(Error::EmptyInput {
        what: "spike trains",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_max_boundary() {
        let trains = vec![SpikeTrain::new(vec![0.001, 0.002, 0.010])];
        let binned = bin_spikes(&trains, TimeWindow::new(0.0, 0.010)).unwrap();

        assert_eq!(binned.n_bins(), 11);
        let ones: Vec<usize> = (0..binned.n_bins())
            .filter(|&c| binned.spikes[(0, c)] == 1)
            .collect();
        assert_eq!(ones, vec![1, 2, 10]);
        assert!((binned.time_axis[10] - 0.010).abs() < 1e-12);
    }

    #[test]
    fn test_inferred_bounds() {
        let trains = vec![
            SpikeTrain::new(vec![0.0105, 0.020]),
            SpikeTrain::new(vec![0.0151, 0.0302]),
        ];
        let binned = bin_spikes(&trains, TimeWindow::default()).unwrap();

        // floor(10.5) = 10 ms to ceil(30.2) = 31 ms
        assert_eq!(binned.n_bins(), 22);
        assert!((binned.time_axis[0] - 0.010).abs() < 1e-12);
        assert_eq!(binned.spikes[(0, 0)], 1);
        assert_eq!(binned.spikes[(0, 10)], 1);
        assert_eq!(binned.spikes[(1, 5)], 1);
        assert_eq!(binned.spikes[(1, 20)], 1);
    }

    #[test]
    fn test_spikes_in_same_bin_collapse() {
        let trains = vec![SpikeTrain::new(vec![0.0031, 0.0032, 0.0039])];
        let binned = bin_spikes(&trains, TimeWindow::new(0.0, 0.005)).unwrap();
        let total: u32 = binned.spikes.iter().map(|&v| u32::from(v)).sum();
        assert_eq!(total, 1);
        assert_eq!(binned.spikes[(0, 3)], 1);
    }

    #[test]
    fn test_out_of_window_spikes_dropped() {
        let trains = vec![SpikeTrain::new(vec![-0.5, 0.002, 0.7])];
        let binned = bin_spikes(&trains, TimeWindow::new(0.0, 0.005)).unwrap();
        let total: u32 = binned.spikes.iter().map(|&v| u32::from(v)).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_empty_train_requires_bounds() {
        let trains = vec![SpikeTrain::new(vec![0.01]), SpikeTrain::default()];
        assert_eq!(
            bin_spikes(&trains, TimeWindow::default()),
            Err(Error::EmptySpikeTrain { row: 1 })
        );

        let binned = bin_spikes(&trains, TimeWindow::new(0.0, 0.02)).unwrap();
        assert_eq!(binned.n_trials(), 2);
        assert!(binned.spikes.row(1).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_unsorted_rejected() {
        let trains = vec![SpikeTrain::new(vec![0.02, 0.01])];
        assert_eq!(
            bin_spikes(&trains, TimeWindow::new(0.0, 0.1)),
            Err(Error::UnsortedSpikeTrain { row: 0 })
        );
    }

    #[test]
    fn test_sentinel_maps_to_empty() {
        assert!(SpikeTrain::from_recorded(vec![NO_SPIKES_SENTINEL]).is_empty());
        assert_eq!(SpikeTrain::from_recorded(vec![0.1, 0.2]).len(), 2);
    }
}
