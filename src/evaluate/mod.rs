//! Regression and probabilistic accuracy metrics
//!
//! Regression metrics run on the back-transformed target scale.
//! Probabilistic metrics treat "finished first" as the binary label.
//! Every market comparison operates strictly at race granularity.

use crate::data::{Entry, RaceGroups};
use crate::error::{FurlongError, Result};
use crate::simulate::RaceProbabilities;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Root mean squared error.
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let mse = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

/// Mean absolute error.
pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// Coefficient of determination.
pub fn r2(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Regression metrics on the original speed scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

pub fn regression_report(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<RegressionReport> {
    if y_true.len() != y_pred.len() {
        return Err(FurlongError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    Ok(RegressionReport {
        rmse: rmse(y_true, y_pred),
        mae: mae(y_true, y_pred),
        r2: r2(y_true, y_pred),
    })
}

/// Binary log loss with probabilities clamped away from 0 and 1.
pub fn log_loss(probs: &Array1<f64>, labels: &Array1<f64>) -> Result<f64> {
    if probs.len() != labels.len() {
        return Err(FurlongError::ShapeError {
            expected: format!("{} labels", probs.len()),
            actual: format!("{} labels", labels.len()),
        });
    }
    let eps = 1e-15;
    let n = probs.len() as f64;
    let total: f64 = probs
        .iter()
        .zip(labels.iter())
        .map(|(&p, &y)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum();
    Ok(-total / n)
}

/// Brier score: mean squared distance between probability and outcome.
pub fn brier_score(probs: &Array1<f64>, labels: &Array1<f64>) -> Result<f64> {
    if probs.len() != labels.len() {
        return Err(FurlongError::ShapeError {
            expected: format!("{} labels", probs.len()),
            actual: format!("{} labels", labels.len()),
        });
    }
    let n = probs.len() as f64;
    let score: f64 = probs
        .iter()
        .zip(labels.iter())
        .map(|(&p, &y)| (p - y).powi(2))
        .sum();
    Ok(score / n)
}

/// Spearman rank correlation with average ranks for ties.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let ra = average_ranks(a);
    let rb = average_ranks(b);
    pearson(&ra, &rb)
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - x_mean;
        let dy = b - y_mean;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denom = (sum_x2 * sum_y2).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        sum_xy / denom
    }
}

/// Probabilistic accuracy and market comparison, all per race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityReport {
    pub log_loss: f64,
    pub brier_score: f64,
    /// Mean per-race Spearman correlation between market-implied and
    /// model probabilities, over races with complete market odds
    pub mean_spearman: f64,
    pub races_compared_to_market: usize,
    /// Races skipped from market comparison for missing odds
    pub races_skipped_missing_odds: usize,
    /// Fraction of races where the model's top choice won
    pub champion_model: f64,
    /// Fraction of races (with complete odds) where the market favourite won
    pub champion_market: f64,
    /// Mean of 1/field-size across all races
    pub champion_uniform: f64,
}

/// Evaluate simulated probabilities against outcomes and the market.
pub fn probability_report(
    entries: &[Entry],
    groups: &RaceGroups,
    races: &[RaceProbabilities],
) -> Result<ProbabilityReport> {
    if groups.n_rows() != entries.len() {
        return Err(FurlongError::ShapeError {
            expected: format!("{} entries", groups.n_rows()),
            actual: format!("{} entries", entries.len()),
        });
    }

    let mut flat_probs = Vec::with_capacity(entries.len());
    let mut flat_labels = Vec::with_capacity(entries.len());
    let mut spearmans = Vec::new();
    let mut skipped_missing_odds = 0usize;
    let mut model_correct = 0usize;
    let mut market_correct = 0usize;
    let mut market_races = 0usize;
    let mut uniform_sum = 0.0;

    for race in races {
        let n = race.rows.len();
        if n == 0 {
            continue;
        }
        uniform_sum += 1.0 / n as f64;

        for (&row, &p) in race.rows.iter().zip(race.probabilities.iter()) {
            flat_probs.push(p);
            flat_labels.push(if entries[row].won() { 1.0 } else { 0.0 });
        }

        // model top choice; argmax keeps the earliest entry on ties
        let model_pick = argmax(&race.probabilities);
        if entries[race.rows[model_pick]].won() {
            model_correct += 1;
        }

        // market comparison needs every entry quoted
        let odds: Option<Vec<f64>> = race
            .rows
            .iter()
            .map(|&row| entries[row].market_odds)
            .collect();
        match odds {
            Some(odds) => {
                market_races += 1;
                let inv: Vec<f64> = odds.iter().map(|o| 1.0 / o).collect();
                let inv_sum: f64 = inv.iter().sum();
                let implied: Vec<f64> = inv.iter().map(|v| v / inv_sum).collect();

                let market_pick = argmax(&implied);
                if entries[race.rows[market_pick]].won() {
                    market_correct += 1;
                }
                if n >= 2 {
                    spearmans.push(spearman(&implied, &race.probabilities));
                }
            }
            None => skipped_missing_odds += 1,
        }
    }

    let flat_probs = Array1::from(flat_probs);
    let flat_labels = Array1::from(flat_labels);
    let n_races = races.len().max(1);

    Ok(ProbabilityReport {
        log_loss: log_loss(&flat_probs, &flat_labels)?,
        brier_score: brier_score(&flat_probs, &flat_labels)?,
        mean_spearman: if spearmans.is_empty() {
            0.0
        } else {
            spearmans.iter().sum::<f64>() / spearmans.len() as f64
        },
        races_compared_to_market: market_races,
        races_skipped_missing_odds: skipped_missing_odds,
        champion_model: model_correct as f64 / n_races as f64,
        champion_market: if market_races == 0 {
            0.0
        } else {
            market_correct as f64 / market_races as f64
        },
        champion_uniform: uniform_sum / n_races as f64,
    })
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics_on_perfect_fit() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let report = regression_report(&y, &y).unwrap();
        assert!(report.rmse.abs() < 1e-12);
        assert!(report.mae.abs() < 1e-12);
        assert!((report.r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_and_brier_closed_form() {
        // one race, entries labeled [1, 0, 0] with probabilities [0.6, 0.3, 0.1]
        let probs = array![0.6, 0.3, 0.1];
        let labels = array![1.0, 0.0, 0.0];

        let ll = log_loss(&probs, &labels).unwrap();
        assert!((ll - 0.324287).abs() < 1e-6, "log loss = {ll}");

        let brier = brier_score(&probs, &labels).unwrap();
        assert!((brier - 0.086667).abs() < 1e-6, "brier = {brier}");
    }

    #[test]
    fn test_spearman_perfect_and_inverted() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![10.0, 20.0, 30.0, 40.0];
        assert!((spearman(&a, &b) - 1.0).abs() < 1e-12);

        let c = vec![40.0, 30.0, 20.0, 10.0];
        assert!((spearman(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let ranks = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
    }

    fn entry(race_id: &str, finish_pos: u32, market_odds: Option<f64>) -> Entry {
        Entry {
            race_id: race_id.to_string(),
            horse_id: format!("{race_id}-{finish_pos}"),
            course: "Ascot".to_string(),
            going: "Good".to_string(),
            distance: 1600.0,
            elapsed: 95.0,
            finish_pos,
            market_odds,
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

    #[test]
    fn test_probability_report_race_granularity() {
        // race a: model and market both pick the winner
        // race b: missing odds, skipped from market comparison
        let entries = vec![
            entry("a", 1, Some(2.0)),
            entry("a", 2, Some(4.0)),
            entry("a", 3, Some(8.0)),
            entry("b", 2, None),
            entry("b", 1, Some(3.0)),
        ];
        let groups = RaceGroups::from_entries(&entries);
        let races = vec![
            RaceProbabilities {
                race_id: "a".to_string(),
                rows: vec![0, 1, 2],
                probabilities: vec![0.6, 0.3, 0.1],
            },
            RaceProbabilities {
                race_id: "b".to_string(),
                rows: vec![3, 4],
                probabilities: vec![0.7, 0.3],
            },
        ];

        let report = probability_report(&entries, &groups, &races).unwrap();

        assert_eq!(report.races_compared_to_market, 1);
        assert_eq!(report.races_skipped_missing_odds, 1);
        // model picked the winner in race a only
        assert!((report.champion_model - 0.5).abs() < 1e-12);
        assert!((report.champion_market - 1.0).abs() < 1e-12);
        // mean of 1/3 and 1/2
        assert!((report.champion_uniform - (1.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
        // race a: implied [4/7, 2/7, 1/7] and model [0.6, 0.3, 0.1] agree in rank
        assert!((report.mean_spearman - 1.0).abs() < 1e-12);
    }
}
