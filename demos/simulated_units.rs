//! Decode simulated auditory responses and estimate their information.
//!
//! Six stimuli in three call types drive one unit whose firing latency
//! depends on the stimulus. The demo decodes the trials by nearest template,
//! then fits a Gaussian to early/late spike counts and estimates the
//! information those counts carry about the stimulus.
//!
//! Run with `cargo run --example simulated_units`.

use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use spike_info::{
    fit_gaussians, output, GroupingKey, MonteCarloEstimator, Smoothing, SpikeTrain,
    TemplateDecoder, TimeWindow, TrialRecord, TrialTable,
};

const STIMULI: u32 = 6;
const TRIALS: u32 = 12;
const DURATION_MS: u32 = 300;

/// Spike probability per ms: background plus a burst at a stimulus-specific latency.
fn rate(stim: u32, ms: u32) -> f64 {
    let latency = 30.0 + 35.0 * stim as f64;
    let t = ms as f64 - latency;
    0.005 + 0.25 * (-t * t / 200.0).exp()
}

fn simulate(rng: &mut Xoshiro256PlusPlus) -> spike_info::Result<(TrialTable, Vec<SpikeTrain>)> {
    let mut records = Vec::new();
    let mut trains = Vec::new();
    for stim in 0..STIMULI {
        for trial in 0..TRIALS {
            records.push(TrialRecord::new(1, 3, stim, stim / 2, trial));
            let times: Vec<f64> = (0..DURATION_MS)
                .filter(|&ms| rng.random::<f64>() < rate(stim, ms))
                .map(|ms| ms as f64 / 1e3)
                .collect();
            trains.push(if times.is_empty() {
                SpikeTrain::from_recorded(vec![spike_info::NO_SPIKES_SENTINEL])
            } else {
                SpikeTrain::new(times)
            });
        }
    }
    Ok((TrialTable::new(records)?, trains))
}

/// Spike counts in the first and second half of the window.
fn early_late_counts(trains: &[SpikeTrain]) -> DMatrix<f64> {
    let half = DURATION_MS as f64 / 2e3;
    DMatrix::from_fn(trains.len(), 2, |i, j| {
        trains[i]
            .times()
            .iter()
            .filter(|&&t| (t < half) == (j == 0))
            .count() as f64
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
    let (table, trains) = simulate(&mut rng)?;
    info!(trials = table.len(), "Simulated unit");

    let window = TimeWindow::new(0.0, (DURATION_MS - 1) as f64 / 1e3);
    for grouping in [GroupingKey::Stimulus, GroupingKey::StimulusType] {
        let mut result = TemplateDecoder::new()
            .grouping(grouping)
            .smoothing(Smoothing::Gaussian { std_ms: 8.0 })
            .time_window(window)
            .seed(7)
            .decode_spikes(&table, &trains)?;

        if grouping == GroupingKey::Stimulus {
            result.confusion.set_sorter(table.stimulus_sorter())?;
        }
        println!("{}", output::to_json_pretty(&result.summary()?)?);
    }

    let counts = early_late_counts(&trains);
    let (_, mixture) = fit_gaussians(&table, &counts, GroupingKey::Stimulus)?;
    for estimator in [
        MonteCarloEstimator::new().samples(20_000).seed(1),
        MonteCarloEstimator::new().samples(20_000).seed(1).anthropic(),
    ] {
        let estimate = estimator.estimate(&mixture)?;
        info!(
            mode = ?estimator.mode,
            bits = estimate.bits,
            standard_error = estimate.standard_error,
            dropped = estimate.n_dropped(),
            "Count information"
        );
        println!("{}", output::to_json(&estimate)?);
    }

    Ok(())
}
