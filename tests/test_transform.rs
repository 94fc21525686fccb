//! Integration test: transform pipeline scenarios

use furlong::data::Entry;
use furlong::features::FeatureFrame;
use furlong::transform::{sample_skewness, GroupedMedianImputer, Transformer};
use ndarray::{Array1, Array2};

fn entry(race_id: &str, horse_id: &str, going: &str) -> Entry {
    Entry {
        race_id: race_id.to_string(),
        horse_id: horse_id.to_string(),
        course: "Ascot".to_string(),
        going: going.to_string(),
        distance: 1600.0,
        elapsed: 95.0,
        finish_pos: 1,
        market_odds: None,
        prev_speed: None,
        prev_speed_2: None,
        jockey_rating: None,
        trainer_rating: None,
        days_since_run: None,
        prev_odds: None,
        age: None,
        prize_money: None,
    }
}

fn frame(names: &[&str], rows: Vec<Vec<f64>>) -> FeatureFrame {
    let n_rows = rows.len();
    let n_cols = names.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    FeatureFrame::new(
        names.iter().map(|s| s.to_string()).collect(),
        Array2::from_shape_vec((n_rows, n_cols), flat).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_soft_going_median_fills_missing_trainer_rating() {
    // training rows on Soft going with trainer ratings whose median is 85.0
    let train_frame = frame(
        &["trainer_rating"],
        vec![vec![80.0], vec![85.0], vec![90.0], vec![60.0], vec![70.0]],
    );
    let going: Vec<String> = ["Soft", "Soft", "Soft", "Firm", "Firm"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let imputer = GroupedMedianImputer::fit(&train_frame, &going).unwrap();
    assert_eq!(imputer.lookup("Soft", "trainer_rating"), Some(85.0));

    // a test row on Soft going with the rating missing fills to exactly 85.0
    let mut data = Array2::from_shape_vec((1, 1), vec![f64::NAN]).unwrap();
    let misses = imputer.apply(
        &mut data,
        &["trainer_rating".to_string()],
        &["Soft".to_string()],
    );
    assert_eq!(misses, 0);
    assert_eq!(data[[0, 0]], 85.0);
}

#[test]
fn test_heavily_skewed_feature_routed_to_power_transform() {
    // one long-tailed column (skewness well above the 1.0 threshold)
    // and one symmetric column
    let skewed = vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 5.0, 9.0, 60.0];
    let symmetric = vec![
        -3.0, -2.0, -1.5, -1.0, -0.5, -0.1, 0.1, 0.5, 1.0, 1.5, 2.0, 3.0,
    ];
    assert!(sample_skewness(&skewed) > 1.0);
    assert!(sample_skewness(&symmetric).abs() < 1.0);

    let rows: Vec<Vec<f64>> = skewed
        .iter()
        .zip(symmetric.iter())
        .map(|(&s, &y)| vec![s, y])
        .collect();
    let train_frame = frame(&["long_tail", "balanced"], rows);

    let entries: Vec<Entry> = (0..12)
        .map(|i| {
            let going = if i % 2 == 0 { "Good" } else { "Soft" };
            entry(&format!("r{}", i / 4), &format!("h{i}"), going)
        })
        .collect();
    let target = Array1::from_iter((0..12).map(|i| 14.0 + i as f64 * 0.2));

    let state = Transformer::new()
        .fit(&train_frame, &entries, &target)
        .unwrap();

    let power = state.power_routed_fields();
    assert!(power.contains(&"long_tail".to_string()));
    assert!(!power.contains(&"balanced".to_string()));
}

#[test]
fn test_fit_then_apply_reproduces_training_output() {
    let rows: Vec<Vec<f64>> = (0..16)
        .map(|i| {
            let x = i as f64;
            vec![x, (x - 8.0).powi(2), 100.0 - 3.0 * x]
        })
        .collect();
    let train_frame = frame(&["a", "b", "c"], rows);

    let entries: Vec<Entry> = (0..16)
        .map(|i| {
            let going = ["Good", "Soft", "Firm", "Heavy"][i % 4];
            entry(&format!("r{}", i / 4), &format!("h{i}"), going)
        })
        .collect();
    let target = Array1::from_iter((0..16).map(|i| 15.0 + (i % 5) as f64 * 0.3));

    let state = Transformer::new()
        .fit(&train_frame, &entries, &target)
        .unwrap();

    let first = state.apply(&train_frame, &entries).unwrap();
    let second = state.apply(&train_frame, &entries).unwrap();
    assert_eq!(first.data, second.data);
    assert_eq!(first.names, second.names);

    // standardized columns center on the training data
    for (col, name) in first.names.iter().enumerate() {
        if state.power_routed_fields().contains(name) || !["a", "b", "c"].contains(&name.as_str())
        {
            continue;
        }
        let column = first.data.column(col);
        let mean = column.sum() / column.len() as f64;
        assert!(mean.abs() < 1e-9, "column {name} mean {mean}");
    }
}

#[test]
fn test_collinear_duplicate_is_pruned_once_for_both_partitions() {
    let rows: Vec<Vec<f64>> = (0..12)
        .map(|i| {
            let x = i as f64 + (i % 3) as f64 * 0.1;
            vec![x, 2.0 * x + 0.01, (i % 4) as f64]
        })
        .collect();
    let train_frame = frame(&["base", "double", "cycle"], rows);

    let entries: Vec<Entry> = (0..12)
        .map(|i| {
            let going = if i % 2 == 0 { "Good" } else { "Soft" };
            entry(&format!("r{}", i / 3), &format!("h{i}"), going)
        })
        .collect();
    let target = Array1::from_iter((0..12).map(|i| 10.0 + i as f64 * 0.5));

    let state = Transformer::new()
        .fit(&train_frame, &entries, &target)
        .unwrap();

    assert!(state.pruned_fields().contains(&"double".to_string()));
    let applied = state.apply(&train_frame, &entries).unwrap();
    assert!(!applied.names.contains(&"double".to_string()));
    assert_eq!(applied.data.ncols(), applied.names.len());
}
