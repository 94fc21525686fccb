//! Race-relative feature engineering
//!
//! Derives engineered features from raw entry fields. Every group
//! statistic is computed over a single race's entries only; no feature
//! depends on data from another race, so engineering can run on any
//! partition without leakage.

use crate::data::{Entry, RaceGroups};
use crate::error::{FurlongError, Result};
use ndarray::{Array2, ArrayView1};

/// Named numeric matrix with NaN marking missing values.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    names: Vec<String>,
    data: Array2<f64>,
}

impl FeatureFrame {
    pub fn new(names: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(FurlongError::ShapeError {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", data.ncols()),
            });
        }
        Ok(Self { names, data })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FurlongError::FeatureNotFound(name.to_string()))?;
        Ok(self.data.column(idx))
    }
}

/// Fields whose race-mean deviation is emitted alongside the raw value.
const DELTA_FIELDS: [&str; 6] = [
    "prev_speed",
    "jockey_rating",
    "trainer_rating",
    "days_since_run",
    "inv_prev_odds",
    "market_prior",
];

/// Derives race-relative and engineered features from raw entries.
///
/// Output row count always equals input row count. Race spread columns
/// use the sample standard deviation (ddof = 1); a single-entry race
/// yields NaN there, which the downstream imputation handles.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Column names of the engineered frame, in emission order.
    pub fn feature_names() -> Vec<String> {
        let mut names = Vec::new();
        for field in DELTA_FIELDS {
            names.push(field.to_string());
            names.push(format!("{field}_delta"));
        }
        names.extend(
            [
                "odds_rank",
                "age_rank",
                "prize_rank",
                "speed_trend",
                "race_speed_std",
                "race_odds_std",
                "distance",
                "age",
                "prize_money",
                "field_size",
            ]
            .map(String::from),
        );
        names
    }

    /// Engineer the feature frame for one partition.
    pub fn engineer(&self, entries: &[Entry], groups: &RaceGroups) -> Result<FeatureFrame> {
        if groups.n_rows() != entries.len() {
            return Err(FurlongError::ShapeError {
                expected: format!("{} grouped rows", entries.len()),
                actual: format!("{} grouped rows", groups.n_rows()),
            });
        }

        let names = Self::feature_names();
        let n_rows = entries.len();
        let mut data = Array2::from_elem((n_rows, names.len()), f64::NAN);

        for (_, rows) in groups.iter() {
            self.engineer_race(entries, rows, &names, &mut data);
        }

        FeatureFrame::new(names, data)
    }

    fn engineer_race(
        &self,
        entries: &[Entry],
        rows: &[usize],
        names: &[String],
        data: &mut Array2<f64>,
    ) {
        let col = |name: &str| names.iter().position(|n| n == name).unwrap();

        // Raw per-entry values the group statistics are taken over
        let raw: Vec<Vec<Option<f64>>> = rows
            .iter()
            .map(|&r| {
                let e = &entries[r];
                let inv_odds = e.prev_odds.map(|o| 1.0 / o);
                vec![
                    e.prev_speed,
                    e.jockey_rating,
                    e.trainer_rating,
                    e.days_since_run,
                    inv_odds,
                    None, // market_prior filled below
                ]
            })
            .collect();

        // Market-implied prior: inverse previous odds normalized within the race
        let inv_sum: f64 = raw.iter().filter_map(|v| v[4]).sum();
        let raw: Vec<Vec<Option<f64>>> = raw
            .into_iter()
            .map(|mut v| {
                v[5] = v[4].and_then(|inv| (inv_sum > 0.0).then(|| inv / inv_sum));
                v
            })
            .collect();

        // Raw value + deviation from the race mean, per delta field
        for (f, field) in DELTA_FIELDS.into_iter().enumerate() {
            let present: Vec<f64> = raw.iter().filter_map(|v| v[f]).collect();
            let mean = if present.is_empty() {
                f64::NAN
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            };

            let raw_col = col(field);
            let delta_col = col(&format!("{field}_delta"));
            for (i, &r) in rows.iter().enumerate() {
                if let Some(v) = raw[i][f] {
                    data[[r, raw_col]] = v;
                    data[[r, delta_col]] = v - mean;
                }
            }
        }

        // Within-race ranks. Odds use min rank (ties share the smallest
        // competing rank); age and prize use dense ranks, prize descending
        // so the richest race entry gets rank 1.
        let odds: Vec<Option<f64>> = rows.iter().map(|&r| entries[r].prev_odds).collect();
        write_ranks(data, rows, col("odds_rank"), &min_rank_ascending(&odds));

        let ages: Vec<Option<f64>> = rows.iter().map(|&r| entries[r].age).collect();
        write_ranks(data, rows, col("age_rank"), &dense_rank(&ages, false));

        let prizes: Vec<Option<f64>> = rows.iter().map(|&r| entries[r].prize_money).collect();
        write_ranks(data, rows, col("prize_rank"), &dense_rank(&prizes, true));

        // Trend and race spread statistics
        let speeds: Vec<Option<f64>> = rows.iter().map(|&r| entries[r].prev_speed).collect();
        let speed_std = sample_std(&speeds);
        let odds_std = sample_std(&odds);

        for &r in rows {
            let e = &entries[r];
            if let (Some(s1), Some(s2)) = (e.prev_speed, e.prev_speed_2) {
                data[[r, col("speed_trend")]] = s1 - s2;
            }
            data[[r, col("race_speed_std")]] = speed_std;
            data[[r, col("race_odds_std")]] = odds_std;
            data[[r, col("distance")]] = e.distance;
            if let Some(a) = e.age {
                data[[r, col("age")]] = a;
            }
            if let Some(p) = e.prize_money {
                data[[r, col("prize_money")]] = p;
            }
            data[[r, col("field_size")]] = rows.len() as f64;
        }
    }
}

fn write_ranks(data: &mut Array2<f64>, rows: &[usize], col: usize, ranks: &[Option<f64>]) {
    for (i, &r) in rows.iter().enumerate() {
        if let Some(rank) = ranks[i] {
            data[[r, col]] = rank;
        }
    }
}

/// Min rank, ascending: tied values all receive the smallest competing
/// rank (1-based). Missing values get no rank.
fn min_rank_ascending(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![None; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        for &idx in &order[i..=j] {
            ranks[idx] = Some((i + 1) as f64);
        }
        i = j + 1;
    }
    ranks
}

/// Dense rank: ties collapse to the same rank and ranks are consecutive
/// integers. `descending` ranks the largest value 1.
fn dense_rank(values: &[Option<f64>], descending: bool) -> Vec<Option<f64>> {
    let mut distinct: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();
    if descending {
        distinct.reverse();
    }

    values
        .iter()
        .map(|v| {
            v.map(|x| {
                let pos = distinct.iter().position(|&d| d == x).unwrap_or(0);
                (pos + 1) as f64
            })
        })
        .collect()
}

/// Sample standard deviation (ddof = 1) over present values; NaN when
/// fewer than two values are present.
fn sample_std(values: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if present.len() < 2 {
        return f64::NAN;
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}
