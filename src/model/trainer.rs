//! Feature selection and final model fitting
//!
//! Ranks features by permutation importance on a held-out fold, walks
//! the grouped-CV RMSE curve over candidate top-K sizes, selects the
//! smallest K on the plateau, and refits the final model on the full
//! training set restricted to the selected features.

use crate::data::RaceGroups;
use crate::error::{FurlongError, Result};
use crate::evaluate::rmse;
use crate::model::cross_validation::GroupKFold;
use crate::model::importance::{ImportanceResult, PermutationImportance};
use crate::model::linear::LinearRegression;
use crate::transform::AppliedMatrix;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Trainer configuration. All randomness is seeded for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub n_folds: usize,
    /// Permutation repeats per feature
    pub n_repeats: usize,
    pub seed: u64,
    /// Smallest candidate top-K size
    pub k_min: usize,
    /// A candidate K is acceptable when its CV RMSE is within this
    /// relative tolerance of the curve minimum; the smallest such K wins
    pub plateau_tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            n_repeats: 10,
            seed: 42,
            k_min: 10,
            plateau_tolerance: 0.01,
        }
    }
}

/// Ordered list of feature names retained after importance ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFeatureSet {
    names: Vec<String>,
}

impl SelectedFeatureSet {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Final fitted model plus the frozen selection it was trained with.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    model: LinearRegression,
    selected: SelectedFeatureSet,
    importance: ImportanceResult,
    /// (candidate K, grouped-CV RMSE)
    cv_curve: Vec<(usize, f64)>,
}

impl TrainedModel {
    /// Predict on a transformed matrix using the selected features.
    /// The same K feature names, in the same representation, serve
    /// training and test prediction.
    pub fn predict(&self, matrix: &AppliedMatrix) -> Result<Array1<f64>> {
        let x = matrix.select(self.selected.names())?;
        self.model.predict(&x)
    }

    pub fn selected(&self) -> &SelectedFeatureSet {
        &self.selected
    }

    pub fn importance(&self) -> &ImportanceResult {
        &self.importance
    }

    pub fn cv_curve(&self) -> &[(usize, f64)] {
        &self.cv_curve
    }
}

/// Trains the linear model with grouped cross-validation.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn train(
        &self,
        matrix: &AppliedMatrix,
        target: &Array1<f64>,
        groups: &RaceGroups,
    ) -> Result<TrainedModel> {
        let n_features = matrix.data.ncols();
        if n_features == 0 {
            return Err(FurlongError::ConfigError(
                "no features left to train on".to_string(),
            ));
        }

        let splits = GroupKFold::new(self.config.n_folds)
            .with_seed(self.config.seed)
            .split(groups)?;

        // Rank features on the first split: fit on the train folds,
        // measure permutation importance on the held-out fold
        let first = &splits[0];
        let x_train = matrix.data.select(Axis(0), &first.train_indices);
        let y_train = target.select(Axis(0), &first.train_indices);
        let x_held = matrix.data.select(Axis(0), &first.test_indices);
        let y_held = target.select(Axis(0), &first.test_indices);

        let mut ranking_model = LinearRegression::new();
        ranking_model.fit(&x_train, &y_train)?;

        let importance =
            PermutationImportance::new(|x: &Array2<f64>| ranking_model.predict(x), matrix.names.clone())
                .with_n_repeats(self.config.n_repeats)
                .with_seed(self.config.seed)
                .compute(&x_held, &y_held)?;
        let ranked = importance.ranked_names();

        // Grouped-CV RMSE for each candidate top-K using the fixed ranking
        let k_min = self.config.k_min.min(n_features);
        let mut cv_curve = Vec::with_capacity(n_features - k_min + 1);
        for k in k_min..=n_features {
            let top_k: Vec<String> = ranked[..k].to_vec();
            let x_sel = matrix.select(&top_k)?;
            let score = cv_rmse(&x_sel, target, &splits)?;
            cv_curve.push((k, score));
        }

        let best = cv_curve
            .iter()
            .map(|&(_, s)| s)
            .fold(f64::INFINITY, f64::min);
        let (selected_k, selected_rmse) = cv_curve
            .iter()
            .find(|&&(_, s)| s <= best * (1.0 + self.config.plateau_tolerance))
            .copied()
            .unwrap_or((n_features, best));

        info!(
            k = selected_k,
            cv_rmse = selected_rmse,
            "selected top-K feature set"
        );

        let selected = SelectedFeatureSet {
            names: ranked[..selected_k].to_vec(),
        };

        // Final refit on the full training set restricted to the selection
        let x_final = matrix.select(selected.names())?;
        let mut model = LinearRegression::new();
        model.fit(&x_final, target)?;

        Ok(TrainedModel {
            model,
            selected,
            importance,
            cv_curve,
        })
    }
}

fn cv_rmse(
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[crate::model::cross_validation::CVSplit],
) -> Result<f64> {
    let mut scores = Vec::with_capacity(splits.len());
    for split in splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = LinearRegression::new();
        model.fit(&x_train, &y_train)?;
        let pred = model.predict(&x_test)?;
        scores.push(rmse(&y_test, &pred));
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}
