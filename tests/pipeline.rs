//! End-to-end decoding tests.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use spike_info::{
    nearest_template_with_ties, template_selectors, DecodingResult, GroupingKey, Smoothing,
    SpikeTrain, SubsamplePolicy, TemplateDecoder, TemplateEngine, TimeWindow, TrialRecord,
    TrialTable,
};

fn four_trials() -> (TrialTable, DMatrix<f64>) {
    let table = TrialTable::new(vec![
        TrialRecord::new(1, 1, 0, 0, 0),
        TrialRecord::new(1, 1, 0, 0, 1),
        TrialRecord::new(1, 1, 1, 1, 0),
        TrialRecord::new(1, 1, 1, 1, 1),
    ])
    .expect("consistent table");
    let features = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 0.0, 1.0, 10.0, 0.0, 10.0, 1.0]);
    (table, features)
}

/// Four trials in two well-separated categories decode perfectly.
#[test]
fn four_trial_scenario() {
    let (table, features) = four_trials();
    let result = TemplateDecoder::new()
        .seed(7)
        .decode(&table, &features)
        .expect("decoding succeeds");

    // Own-category template is the other trial of the category
    for row in 0..4 {
        let own = row / 2;
        assert!((result.distances[(row, own)] - 1.0).abs() < 1e-12);
        assert!(result.distances[(row, 1 - own)] >= 10.0);
        assert_eq!(result.predictions[row].labels(), &[own]);
    }

    assert_eq!(
        result.confusion.matrix(),
        DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0])
    );
    assert!((result.accuracy().unwrap() - 1.0).abs() < 1e-12);
    assert!((result.information().unwrap() - 1.0).abs() < 1e-12);

    let summary = result.summary().unwrap();
    assert_eq!(summary.n_trials, 4);
    assert_eq!(summary.n_ties, 0);
    assert_eq!(summary.categories, vec![0, 1]);
    assert!((summary.max_information_bits - 1.0).abs() < 1e-12);
}

/// A row's own pool never contains the row, for both grouping keys.
#[test]
fn leave_one_out_excludes_own_row() {
    let table = TrialTable::new(vec![
        TrialRecord::new(0, 0, 0, 0, 0),
        TrialRecord::new(0, 0, 0, 0, 1),
        TrialRecord::new(0, 0, 1, 0, 0),
        TrialRecord::new(0, 0, 1, 0, 1),
        TrialRecord::new(0, 0, 2, 1, 0),
        TrialRecord::new(0, 0, 2, 1, 1),
        TrialRecord::new(0, 0, 3, 1, 0),
    ])
    .unwrap();

    for key in [GroupingKey::Stimulus, GroupingKey::StimulusType] {
        let tensor = template_selectors(&table, key).unwrap();
        let own = table.category_indices(key);
        for (row, &category) in own.iter().enumerate() {
            let selector = tensor.get(row, category).unwrap();
            assert!(!selector.contains(row), "row {row} in its own pool ({key})");
            if key == GroupingKey::StimulusType {
                // Same type, different stimulus or trial stays in the pool
                let record = table.records()[row];
                for (other, r) in table.records().iter().enumerate() {
                    let same_pair = r.stim == record.stim && r.trial == record.trial;
                    let same_type = r.stim_type == record.stim_type;
                    assert_eq!(selector.contains(other), same_type && !same_pair);
                }
            }
        }
    }
}

/// Ties between equidistant templates split credit.
#[test]
fn ties_split_credit() {
    let table = TrialTable::new(vec![
        TrialRecord::new(0, 0, 0, 0, 0),
        TrialRecord::new(0, 0, 0, 0, 1),
        TrialRecord::new(0, 0, 1, 1, 0),
        TrialRecord::new(0, 0, 1, 1, 1),
    ])
    .unwrap();
    // Every trial identical, so every template is equally close
    let features = DMatrix::from_element(4, 3, 1.0);

    let result = TemplateDecoder::full_pools()
        .decode(&table, &features)
        .unwrap();
    assert_eq!(result.n_ties(), 4);
    assert!((result.confusion.total() - 4.0).abs() < 1e-12);
    assert!((result.accuracy().unwrap() - 0.5).abs() < 1e-12);
    assert!(result.information().unwrap().abs() < 1e-12);
}

/// Seeded sub-sampling is reproducible; the cache does not change results.
#[test]
fn seeded_runs_are_reproducible() {
    let table = TrialTable::new(
        (0..3)
            .flat_map(|stim| (0..5).map(move |trial| TrialRecord::new(0, 0, stim, stim, trial)))
            .collect(),
    )
    .unwrap();
    let features = DMatrix::from_fn(15, 4, |i, j| ((i * 7 + j * 3) % 11) as f64);

    let tensor = template_selectors(&table, GroupingKey::Stimulus).unwrap();
    let run = |capacity: usize| {
        let mut engine = TemplateEngine::new(Default::default(), capacity);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(99);
        engine
            .compute_distances(
                &features,
                &tensor,
                SubsamplePolicy::EqualizeToSmallestPool,
                &mut rng,
            )
            .unwrap()
    };

    let cached = run(4_096);
    let tiny_cache = run(1);
    assert_eq!(cached, tiny_cache);
    assert_eq!(
        nearest_template_with_ties(&cached).unwrap(),
        nearest_template_with_ties(&tiny_cache).unwrap()
    );
}

/// Spike trains go through binning and smoothing before decoding.
#[test]
fn decode_from_spike_trains() {
    let (table, _) = four_trials();
    let trains = vec![
        SpikeTrain::from_recorded(vec![0.010, 0.011, 0.030]),
        SpikeTrain::from_recorded(vec![0.010, 0.012, 0.031]),
        SpikeTrain::from_recorded(vec![-999.0]),
        SpikeTrain::from_recorded(vec![-999.0]),
    ];

    let result = TemplateDecoder::new()
        .smoothing(Smoothing::Exponential { tau_ms: 3.0 })
        .time_window(TimeWindow::new(0.0, 0.040))
        .seed(5)
        .decode_spikes(&table, &trains)
        .unwrap();

    assert_eq!(result.distances.nrows(), 4);
    assert!((result.accuracy().unwrap() - 1.0).abs() < 1e-12);
}

/// Inferred bounds need every train to have spikes.
#[test]
fn silent_trial_requires_explicit_window() {
    let (table, _) = four_trials();
    let trains = vec![
        SpikeTrain::new(vec![0.010]),
        SpikeTrain::new(vec![0.011]),
        SpikeTrain::from_recorded(vec![-999.0]),
        SpikeTrain::new(vec![0.030]),
    ];
    let err = TemplateDecoder::new()
        .decode_spikes(&table, &trains)
        .unwrap_err();
    assert_eq!(err, spike_info::Error::EmptySpikeTrain { row: 2 });
}

/// Saved results reload intact; tampered label sets or sorters are refused.
#[test]
fn decoding_result_reloads_with_checks() {
    let (table, features) = four_trials();
    let mut result = TemplateDecoder::new().seed(7).decode(&table, &features).unwrap();
    result.confusion.set_sorter(vec![1, 0]).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let back: DecodingResult = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(back.predictions, result.predictions);
    assert_eq!(back.confusion.matrix(), result.confusion.matrix());
    assert!((back.confusion.total() - 4.0).abs() < 1e-12);

    let mut empty_prediction = json.clone();
    empty_prediction["predictions"][0] = serde_json::json!([]);
    assert!(serde_json::from_value::<DecodingResult>(empty_prediction).is_err());

    let mut bad_sorter = json;
    bad_sorter["confusion"]["sorter"] = serde_json::json!([5, 0]);
    assert!(serde_json::from_value::<DecodingResult>(bad_sorter).is_err());
}
