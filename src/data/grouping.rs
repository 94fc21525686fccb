//! Per-race grouping abstraction
//!
//! Races group a fixed set of entries. The same grouping is consumed by
//! feature engineering, grouped cross-validation, simulation, and
//! evaluation, so it is derived once here rather than rebuilt ad hoc.

use crate::data::Entry;
use std::collections::HashMap;

/// Maps each race identifier to the ordered set of row indices that
/// belong to it. Race order follows first appearance in the partition;
/// entry order within a race follows row order.
#[derive(Debug, Clone)]
pub struct RaceGroups {
    keys: Vec<String>,
    indices: Vec<Vec<usize>>,
    by_key: HashMap<String, usize>,
}

impl RaceGroups {
    /// Build the grouping from a partition of entries.
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut keys = Vec::new();
        let mut indices: Vec<Vec<usize>> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for (row, entry) in entries.iter().enumerate() {
            match by_key.get(&entry.race_id) {
                Some(&group) => indices[group].push(row),
                None => {
                    by_key.insert(entry.race_id.clone(), keys.len());
                    keys.push(entry.race_id.clone());
                    indices.push(vec![row]);
                }
            }
        }

        Self {
            keys,
            indices,
            by_key,
        }
    }

    /// Number of races in the partition.
    pub fn n_races(&self) -> usize {
        self.keys.len()
    }

    /// Total number of rows covered by the grouping.
    pub fn n_rows(&self) -> usize {
        self.indices.iter().map(Vec::len).sum()
    }

    /// Row indices for a race identifier.
    pub fn rows_for(&self, race_id: &str) -> Option<&[usize]> {
        self.by_key.get(race_id).map(|&g| self.indices[g].as_slice())
    }

    /// Iterate over (race id, row indices) in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.keys
            .iter()
            .zip(self.indices.iter())
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The group index of each row, usable as a fold-assignment key.
    pub fn group_of_rows(&self) -> Vec<usize> {
        let mut out = vec![0usize; self.n_rows()];
        for (group, rows) in self.indices.iter().enumerate() {
            for &row in rows {
                out[row] = group;
            }
        }
        out
    }
}
