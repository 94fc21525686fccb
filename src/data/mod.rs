//! Race entry data model
//!
//! Provides the typed entry schema, partition cleaning, the reusable
//! per-race grouping abstraction, and CSV loading/writing at the
//! boundary of the pipeline.

mod grouping;
pub mod loader;

pub use grouping::RaceGroups;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One horse's participation in one race.
///
/// Predictor fields are optional; missing values flow into the grouped
/// imputation path. `market_odds` is a test-time comparison field only
/// and is never used for modelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub race_id: String,
    pub horse_id: String,
    pub course: String,
    pub going: String,
    /// Race distance in meters
    pub distance: f64,
    /// Elapsed time in seconds; zero-duration rows are dropped during cleaning
    pub elapsed: f64,
    /// Finishing position, 1 = winner
    pub finish_pos: u32,
    pub market_odds: Option<f64>,
    /// Most recent prior speed
    pub prev_speed: Option<f64>,
    /// Second most recent prior speed
    pub prev_speed_2: Option<f64>,
    pub jockey_rating: Option<f64>,
    pub trainer_rating: Option<f64>,
    pub days_since_run: Option<f64>,
    /// Starting odds in the horse's previous race
    pub prev_odds: Option<f64>,
    pub age: Option<f64>,
    pub prize_money: Option<f64>,
}

impl Entry {
    /// The regression label: distance divided by elapsed time.
    ///
    /// Only defined for cleaned entries (`elapsed > 0`).
    pub fn speed(&self) -> f64 {
        self.distance / self.elapsed
    }

    /// Whether this entry won its race.
    pub fn won(&self) -> bool {
        self.finish_pos == 1
    }
}

/// Counts of data-quality issues encountered while preparing a partition.
///
/// Issues are filtered or left explicitly missing and surfaced here,
/// never silently fabricated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataQualityReport {
    /// Rows dropped because elapsed time was zero or negative
    pub zero_duration_dropped: usize,
    /// Values left missing at apply time because the (going, field)
    /// pair had no imputation lookup entry
    pub imputation_lookup_misses: usize,
    /// Missing values substituted with the neutral transformed value
    /// at matrix finalization (logged, counted, reported)
    pub unresolved_missing_filled: usize,
    /// Test entries missing market odds, excluded from market-comparison metrics
    pub market_odds_missing: usize,
}

/// Drop entries with a zero or negative elapsed time.
///
/// Returns the retained entries and the number of rows dropped. Such
/// rows have an undefined speed target and are removed, not imputed.
pub fn clean_partition(entries: Vec<Entry>) -> (Vec<Entry>, usize) {
    let before = entries.len();
    let cleaned: Vec<Entry> = entries.into_iter().filter(|e| e.elapsed > 0.0).collect();
    let dropped = before - cleaned.len();
    (cleaned, dropped)
}

/// Speed targets for a cleaned partition, in row order.
pub fn speed_targets(entries: &[Entry]) -> Array1<f64> {
    Array1::from_iter(entries.iter().map(Entry::speed))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn entry(race_id: &str, horse_id: &str, elapsed: f64) -> Entry {
        Entry {
            race_id: race_id.to_string(),
            horse_id: horse_id.to_string(),
            course: "Ascot".to_string(),
            going: "Good".to_string(),
            distance: 1600.0,
            elapsed,
            finish_pos: 1,
            market_odds: Some(3.5),
            prev_speed: Some(16.0),
            prev_speed_2: Some(15.5),
            jockey_rating: Some(70.0),
            trainer_rating: Some(65.0),
            days_since_run: Some(21.0),
            prev_odds: Some(4.0),
            age: Some(5.0),
            prize_money: Some(12000.0),
        }
    }

    #[test]
    fn test_clean_partition_drops_zero_duration() {
        let entries = vec![
            entry("r1", "h1", 95.0),
            entry("r1", "h2", 0.0),
            entry("r1", "h3", 97.5),
        ];
        let (cleaned, dropped) = clean_partition(entries);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_speed_target() {
        let e = entry("r1", "h1", 100.0);
        assert!((e.speed() - 16.0).abs() < 1e-12);

        let targets = speed_targets(&[e]);
        assert_eq!(targets.len(), 1);
        assert!((targets[0] - 16.0).abs() < 1e-12);
    }
}
