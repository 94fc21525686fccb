//! Race-grouped cross-validation
//!
//! All entries sharing a race identifier land in the same fold; a race
//! never crosses a fold boundary.

use crate::data::RaceGroups;
use crate::error::{FurlongError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A single train/test split over row indices.
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Grouped K-fold splitter keyed by race.
#[derive(Debug, Clone)]
pub struct GroupKFold {
    n_splits: usize,
    seed: Option<u64>,
}

impl GroupKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            seed: None,
        }
    }

    /// Shuffle race order before fold assignment, reproducibly.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate the splits. Grouped cross-validation is undefined with
    /// fewer than two races; that is a configuration error, never a
    /// silent fall-back to ungrouped splitting.
    pub fn split(&self, groups: &RaceGroups) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(FurlongError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if groups.n_races() < 2 {
            return Err(FurlongError::ConfigError(format!(
                "grouped cross-validation needs at least 2 races, got {}",
                groups.n_races()
            )));
        }
        if groups.n_races() < self.n_splits {
            return Err(FurlongError::ConfigError(format!(
                "number of races ({}) must be >= n_splits ({})",
                groups.n_races(),
                self.n_splits
            )));
        }

        let mut race_order: Vec<usize> = (0..groups.n_races()).collect();
        if let Some(seed) = self.seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            race_order.shuffle(&mut rng);
        }

        // round-robin assignment of whole races to folds
        let mut fold_of_race = vec![0usize; groups.n_races()];
        for (position, &race) in race_order.iter().enumerate() {
            fold_of_race[race] = position % self.n_splits;
        }

        let row_groups = groups.group_of_rows();
        let mut splits = Vec::with_capacity(self.n_splits);
        for fold_idx in 0..self.n_splits {
            let test_indices: Vec<usize> = row_groups
                .iter()
                .enumerate()
                .filter(|(_, &g)| fold_of_race[g] == fold_idx)
                .map(|(i, _)| i)
                .collect();
            let train_indices: Vec<usize> = row_groups
                .iter()
                .enumerate()
                .filter(|(_, &g)| fold_of_race[g] != fold_idx)
                .map(|(i, _)| i)
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Entry;

    fn entries_for_races(sizes: &[usize]) -> Vec<Entry> {
        let mut entries = Vec::new();
        for (race, &size) in sizes.iter().enumerate() {
            for horse in 0..size {
                entries.push(Entry {
                    race_id: format!("r{race}"),
                    horse_id: format!("r{race}h{horse}"),
                    course: "Ascot".to_string(),
                    going: "Good".to_string(),
                    distance: 1600.0,
                    elapsed: 95.0,
                    finish_pos: (horse + 1) as u32,
                    market_odds: None,
                    prev_speed: None,
                    prev_speed_2: None,
                    jockey_rating: None,
                    trainer_rating: None,
                    days_since_run: None,
                    prev_odds: None,
                    age: None,
                    prize_money: None,
                });
            }
        }
        entries
    }

    #[test]
    fn test_races_never_split_across_folds() {
        let entries = entries_for_races(&[4, 6, 3, 5, 7, 4, 5, 6]);
        let groups = RaceGroups::from_entries(&entries);

        let splits = GroupKFold::new(3).with_seed(42).split(&groups).unwrap();
        assert_eq!(splits.len(), 3);

        for split in &splits {
            for (race_id, rows) in groups.iter() {
                let in_test = rows.iter().filter(|r| split.test_indices.contains(r)).count();
                assert!(
                    in_test == 0 || in_test == rows.len(),
                    "race {race_id} split across folds"
                );
            }
        }
    }

    #[test]
    fn test_every_row_tested_exactly_once() {
        let entries = entries_for_races(&[3, 3, 3, 3, 3]);
        let groups = RaceGroups::from_entries(&entries);

        let splits = GroupKFold::new(5).split(&groups).unwrap();
        let mut tested: Vec<usize> = splits
            .iter()
            .flat_map(|s| s.test_indices.clone())
            .collect();
        tested.sort_unstable();
        assert_eq!(tested, (0..entries.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_race_is_config_error() {
        let entries = entries_for_races(&[8]);
        let groups = RaceGroups::from_entries(&entries);
        let err = GroupKFold::new(2).split(&groups).unwrap_err();
        assert!(matches!(err, FurlongError::ConfigError(_)));
    }

    #[test]
    fn test_seed_reproducible() {
        let entries = entries_for_races(&[4, 4, 4, 4, 4, 4]);
        let groups = RaceGroups::from_entries(&entries);

        let a = GroupKFold::new(3).with_seed(7).split(&groups).unwrap();
        let b = GroupKFold::new(3).with_seed(7).split(&groups).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }
}
