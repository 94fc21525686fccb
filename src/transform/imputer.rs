//! Grouped median imputation
//!
//! Medians are computed per (going condition, numeric field) over
//! training rows and frozen. Apply fills missing values from the
//! lookup; a missing (going, field) pair leaves the value missing and
//! is counted as a reportable data-quality signal.

use crate::error::{FurlongError, Result};
use crate::features::FeatureFrame;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields that must never be imputed. Market odds exist only for
/// test-time comparison against the model; fabricating a market signal
/// for a missing quote would corrupt the evaluation, so rows missing it
/// remain missing and the evaluator skips them with a count.
pub const NEVER_IMPUTED: &[&str] = &["market_odds"];

/// Frozen per-(going, field) median lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedMedianImputer {
    /// going value -> field name -> median
    medians: HashMap<String, HashMap<String, f64>>,
    fields: Vec<String>,
}

impl GroupedMedianImputer {
    /// Fit the lookup from a training frame. Every frame column is a
    /// designated field; designating a carved-out field is a
    /// configuration error.
    pub fn fit(frame: &FeatureFrame, going: &[String]) -> Result<Self> {
        if going.len() != frame.n_rows() {
            return Err(FurlongError::ShapeError {
                expected: format!("{} going values", frame.n_rows()),
                actual: format!("{} going values", going.len()),
            });
        }
        for name in frame.names() {
            if NEVER_IMPUTED.contains(&name.as_str()) {
                return Err(FurlongError::ConfigError(format!(
                    "field {name} is excluded from imputation by design"
                )));
            }
        }

        let mut medians: HashMap<String, HashMap<String, f64>> = HashMap::new();

        for (col, name) in frame.names().iter().enumerate() {
            // going value -> present values of this field
            let mut per_group: HashMap<&str, Vec<f64>> = HashMap::new();
            for (row, group) in going.iter().enumerate() {
                let v = frame.data()[[row, col]];
                if v.is_finite() {
                    per_group.entry(group.as_str()).or_default().push(v);
                }
            }

            for (group, values) in per_group {
                medians
                    .entry(group.to_string())
                    .or_default()
                    .insert(name.clone(), median(values));
            }
        }

        Ok(Self {
            medians,
            fields: frame.names().to_vec(),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Median for a (going, field) pair, if the lookup holds one.
    pub fn lookup(&self, going: &str, field: &str) -> Option<f64> {
        self.medians.get(going).and_then(|m| m.get(field)).copied()
    }

    /// Fill missing values in place from the frozen lookup. Returns the
    /// number of values left missing because no lookup entry existed.
    pub fn apply(&self, data: &mut Array2<f64>, names: &[String], going: &[String]) -> usize {
        let mut misses = 0usize;

        for (col, name) in names.iter().enumerate() {
            if !self.fields.contains(name) {
                continue;
            }
            for (row, group) in going.iter().enumerate() {
                if data[[row, col]].is_nan() {
                    match self.lookup(group, name) {
                        Some(m) => data[[row, col]] = m,
                        None => misses += 1,
                    }
                }
            }
        }

        misses
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
