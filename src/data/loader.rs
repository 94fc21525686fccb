//! CSV loading and writing
//!
//! Thin polars boundary converting between flat files and typed entries.
//! All modelling happens on the typed representation; no polars types
//! escape this module.

use crate::data::Entry;
use crate::error::{FurlongError, Result};
use crate::pipeline::WinProbability;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Load a partition of entries from a CSV file.
///
/// Required columns: `race_id`, `horse_id`, `course`, `going`,
/// `distance`, `elapsed`, `finish_pos`. Predictor columns and
/// `market_odds` are optional; an absent column reads as all-missing.
pub fn load_entries(path: &Path) -> Result<Vec<Entry>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(500))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let race_ids = str_column(&df, "race_id")?;
    let horse_ids = str_column(&df, "horse_id")?;
    let courses = str_column(&df, "course")?;
    let goings = str_column(&df, "going")?;
    let distances = required_f64_column(&df, "distance")?;
    let elapsed = required_f64_column(&df, "elapsed")?;
    let finish_pos = required_f64_column(&df, "finish_pos")?;

    let market_odds = optional_f64_column(&df, "market_odds")?;
    let prev_speed = optional_f64_column(&df, "prev_speed")?;
    let prev_speed_2 = optional_f64_column(&df, "prev_speed_2")?;
    let jockey_rating = optional_f64_column(&df, "jockey_rating")?;
    let trainer_rating = optional_f64_column(&df, "trainer_rating")?;
    let days_since_run = optional_f64_column(&df, "days_since_run")?;
    let prev_odds = optional_f64_column(&df, "prev_odds")?;
    let age = optional_f64_column(&df, "age")?;
    let prize_money = optional_f64_column(&df, "prize_money")?;

    let n = df.height();
    let mut entries = Vec::with_capacity(n);
    for i in 0..n {
        entries.push(Entry {
            race_id: race_ids[i].clone(),
            horse_id: horse_ids[i].clone(),
            course: courses[i].clone(),
            going: goings[i].clone(),
            distance: distances[i],
            elapsed: elapsed[i],
            finish_pos: finish_pos[i] as u32,
            market_odds: market_odds[i],
            prev_speed: prev_speed[i],
            prev_speed_2: prev_speed_2[i],
            jockey_rating: jockey_rating[i],
            trainer_rating: trainer_rating[i],
            days_since_run: days_since_run[i],
            prev_odds: prev_odds[i],
            age: age[i],
            prize_money: prize_money[i],
        });
    }

    Ok(entries)
}

/// Write the (race id, horse id) -> win probability table as CSV.
pub fn write_probabilities(path: &Path, probabilities: &[WinProbability]) -> Result<()> {
    let race_ids: Vec<&str> = probabilities.iter().map(|p| p.race_id.as_str()).collect();
    let horse_ids: Vec<&str> = probabilities.iter().map(|p| p.horse_id.as_str()).collect();
    let probs: Vec<f64> = probabilities.iter().map(|p| p.win_prob).collect();

    let mut df = DataFrame::new(vec![
        Series::new("race_id".into(), race_ids).into(),
        Series::new("horse_id".into(), horse_ids).into(),
        Series::new("win_prob".into(), probs).into(),
    ])?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| FurlongError::FeatureNotFound(name.to_string()))?;
    let ca = column
        .str()
        .map_err(|e| FurlongError::DataError(format!("column {name}: {e}")))?;
    Ok(ca
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

fn required_f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = f64_values(df, name)?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                FurlongError::DataError(format!("column {name}: missing value at row {row}"))
            })
        })
        .collect()
}

fn optional_f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if df.column(name).is_err() {
        return Ok(vec![None; df.height()]);
    }
    f64_values(df, name)
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let casted = df
        .column(name)
        .map_err(|_| FurlongError::FeatureNotFound(name.to_string()))?
        .cast(&DataType::Float64)
        .map_err(|e| FurlongError::DataError(format!("column {name}: {e}")))?;
    let ca = casted
        .f64()
        .map_err(|e| FurlongError::DataError(format!("column {name}: {e}")))?;
    Ok(ca.into_iter().collect())
}
