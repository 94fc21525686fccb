//! Permutation feature importance
//!
//! Importance of a feature is the mean increase in held-out RMSE when
//! that feature's values are shuffled, averaged over seeded repeats.

use crate::error::Result;
use crate::evaluate::rmse;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Result of an importance computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceResult {
    pub feature_names: Vec<String>,
    /// Mean RMSE increase per feature, in original column order
    pub importances_mean: Vec<f64>,
    pub importances_std: Vec<f64>,
}

impl ImportanceResult {
    /// Feature indices sorted by mean importance, descending. Ties keep
    /// original column order (stable sort).
    pub fn ranked_indices(&self) -> Vec<usize> {
        let mut indexed: Vec<usize> = (0..self.importances_mean.len()).collect();
        indexed.sort_by(|&a, &b| {
            self.importances_mean[b]
                .partial_cmp(&self.importances_mean[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        indexed
    }

    /// Feature names in rank order.
    pub fn ranked_names(&self) -> Vec<String> {
        self.ranked_indices()
            .into_iter()
            .map(|i| self.feature_names[i].clone())
            .collect()
    }
}

/// Permutation importance calculator over a prediction function.
pub struct PermutationImportance<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    predict_fn: F,
    n_repeats: usize,
    seed: u64,
    feature_names: Vec<String>,
}

impl<F> PermutationImportance<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    pub fn new(predict_fn: F, feature_names: Vec<String>) -> Self {
        Self {
            predict_fn,
            n_repeats: 10,
            seed: 0,
            feature_names,
        }
    }

    pub fn with_n_repeats(mut self, n_repeats: usize) -> Self {
        self.n_repeats = n_repeats.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Compute importances on a held-out set.
    pub fn compute(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ImportanceResult> {
        let n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let baseline_pred = (self.predict_fn)(x)?;
        let baseline = rmse(y, &baseline_pred);

        let mut raw: Vec<Vec<f64>> = vec![Vec::with_capacity(self.n_repeats); n_features];
        for _ in 0..self.n_repeats {
            for feature_idx in 0..n_features {
                let mut x_permuted = x.clone();
                let mut col: Vec<f64> = x.column(feature_idx).to_vec();
                col.shuffle(&mut rng);
                for (row, val) in col.into_iter().enumerate() {
                    x_permuted[[row, feature_idx]] = val;
                }

                let permuted_pred = (self.predict_fn)(&x_permuted)?;
                raw[feature_idx].push(rmse(y, &permuted_pred) - baseline);
            }
        }

        let importances_mean: Vec<f64> = raw
            .iter()
            .map(|scores| scores.iter().sum::<f64>() / scores.len() as f64)
            .collect();
        let importances_std: Vec<f64> = raw
            .iter()
            .zip(importances_mean.iter())
            .map(|(scores, mean)| {
                let var =
                    scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
                var.sqrt()
            })
            .collect();

        Ok(ImportanceResult {
            feature_names: self.feature_names.clone(),
            importances_mean,
            importances_std,
        })
    }
}
