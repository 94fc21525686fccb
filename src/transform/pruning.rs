//! Collinearity pruning
//!
//! Scans the assembled feature matrix in fixed column order and drops
//! any column whose absolute Pearson correlation with an
//! earlier-retained column exceeds the threshold. The dropped set is
//! frozen at fit time and applied unchanged to every partition.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Frozen result of the correlation scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPruner {
    threshold: f64,
    kept: Vec<usize>,
    dropped: Vec<String>,
}

impl CorrelationPruner {
    /// Fit over the assembled training matrix.
    pub fn fit(data: &Array2<f64>, names: &[String], threshold: f64) -> Self {
        let mut kept: Vec<usize> = Vec::new();
        let mut dropped = Vec::new();

        for col in 0..data.ncols() {
            let collinear = kept.iter().any(|&earlier| {
                pairwise_correlation(data.column(earlier), data.column(col)).abs() > threshold
            });
            if collinear {
                dropped.push(names[col].clone());
            } else {
                kept.push(col);
            }
        }

        Self {
            threshold,
            kept,
            dropped,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn kept_indices(&self) -> &[usize] {
        &self.kept
    }

    pub fn dropped_names(&self) -> &[String] {
        &self.dropped
    }

    pub fn kept_names(&self, names: &[String]) -> Vec<String> {
        self.kept.iter().map(|&i| names[i].clone()).collect()
    }

    /// Select the retained columns of a matrix assembled in the same
    /// column order as at fit time.
    pub fn apply(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((data.nrows(), self.kept.len()));
        for (new_idx, &old_idx) in self.kept.iter().enumerate() {
            out.column_mut(new_idx).assign(&data.column(old_idx));
        }
        out
    }
}

/// Pearson correlation over rows where both values are finite.
fn pairwise_correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();

    let n = pairs.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let x_mean = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let y_mean = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    for (a, b) in &pairs {
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

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_later_duplicate_column_dropped() {
        let data = array![
            [1.0, 5.0, 1.1],
            [2.0, 4.0, 2.1],
            [3.0, 3.0, 3.1],
            [4.0, 2.0, 4.1],
            [5.0, 1.0, 5.1],
        ];
        let names: Vec<String> = ["a", "b", "a_copy"].iter().map(|s| s.to_string()).collect();

        let pruner = CorrelationPruner::fit(&data, &names, 0.95);
        assert_eq!(pruner.kept_indices(), &[0, 1]);
        assert_eq!(pruner.dropped_names(), &["a_copy".to_string()]);

        let applied = pruner.apply(&data);
        assert_eq!(applied.shape(), &[5, 2]);
    }

    #[test]
    fn test_uncorrelated_columns_all_kept() {
        let data = array![
            [1.0, 0.0],
            [2.0, 5.0],
            [3.0, 1.0],
            [4.0, 9.0],
            [5.0, 2.0],
        ];
        let names: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let pruner = CorrelationPruner::fit(&data, &names, 0.95);
        assert_eq!(pruner.kept_indices(), &[0, 1]);
        assert!(pruner.dropped_names().is_empty());
    }

    #[test]
    fn test_anticorrelated_column_dropped() {
        // perfect negative correlation also exceeds the absolute threshold
        let data = array![[1.0, -1.0], [2.0, -2.0], [3.0, -3.0], [4.0, -4.0]];
        let names: Vec<String> = ["a", "neg_a"].iter().map(|s| s.to_string()).collect();
        let pruner = CorrelationPruner::fit(&data, &names, 0.95);
        assert_eq!(pruner.kept_indices(), &[0]);
    }
}
