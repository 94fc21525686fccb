//! End-to-end orchestration
//!
//! Wires cleaning, feature engineering, transformation, training,
//! simulation, and evaluation into one batch run. Every fitted
//! statistic comes from the training partition and is applied
//! unchanged to the test partition.

use crate::data::{clean_partition, speed_targets, DataQualityReport, Entry, RaceGroups};
use crate::error::Result;
use crate::evaluate::{probability_report, regression_report, ProbabilityReport, RegressionReport};
use crate::features::FeatureEngineer;
use crate::model::{ModelTrainer, TrainerConfig};
use crate::simulate::{noise_scale_from_target, MonteCarloSimulator};
use crate::transform::{AppliedMatrix, Transformer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Pipeline configuration. One seed drives the grouped splits, the
/// permutation importance, and the simulation sub-seeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub seed: u64,
    pub n_folds: usize,
    pub n_repeats: usize,
    pub n_simulations: usize,
    pub skew_threshold: f64,
    pub correlation_threshold: f64,
    pub k_min: usize,
    pub plateau_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_folds: 5,
            n_repeats: 10,
            n_simulations: 50_000,
            skew_threshold: 1.0,
            correlation_threshold: 0.95,
            k_min: 10,
            plateau_tolerance: 0.01,
        }
    }
}

/// One row of the output artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinProbability {
    pub race_id: String,
    pub horse_id: String,
    pub win_prob: f64,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// (race id, horse id) -> win probability; sums to 1 per race
    pub probabilities: Vec<WinProbability>,
    pub quality: DataQualityReport,
    pub regression: RegressionReport,
    pub probability: ProbabilityReport,
    pub selected_features: Vec<String>,
}

/// The batch pipeline.
#[derive(Debug, Clone, Default)]
pub struct RacePipeline {
    config: PipelineConfig,
}

impl RacePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, train: Vec<Entry>, test: Vec<Entry>) -> Result<PipelineOutcome> {
        let mut quality = DataQualityReport::default();

        let (train, train_dropped) = clean_partition(train);
        let (test, test_dropped) = clean_partition(test);
        quality.zero_duration_dropped = train_dropped + test_dropped;
        if quality.zero_duration_dropped > 0 {
            warn!(
                dropped = quality.zero_duration_dropped,
                "dropped zero-duration entries"
            );
        }
        quality.market_odds_missing = test.iter().filter(|e| e.market_odds.is_none()).count();

        let train_groups = RaceGroups::from_entries(&train);
        let test_groups = RaceGroups::from_entries(&test);
        info!(
            train_races = train_groups.n_races(),
            train_rows = train.len(),
            test_races = test_groups.n_races(),
            test_rows = test.len(),
            "partitions cleaned"
        );

        let engineer = FeatureEngineer::new();
        let train_frame = engineer.engineer(&train, &train_groups)?;
        let test_frame = engineer.engineer(&test, &test_groups)?;

        let y_train = speed_targets(&train);
        let state = Transformer::new()
            .with_skew_threshold(self.config.skew_threshold)
            .with_correlation_threshold(self.config.correlation_threshold)
            .fit(&train_frame, &train, &y_train)?;
        info!(
            features = state.feature_names().len(),
            power_routed = state.power_routed_fields().len(),
            pruned = state.pruned_fields().len(),
            "transform state fitted"
        );

        let mut train_matrix = state.apply(&train_frame, &train)?;
        let mut test_matrix = state.apply(&test_frame, &test)?;
        quality.imputation_lookup_misses =
            train_matrix.lookup_misses + test_matrix.lookup_misses;
        quality.unresolved_missing_filled =
            finalize_matrix(&mut train_matrix) + finalize_matrix(&mut test_matrix);

        let y_train_t = state.transform_target(&y_train);
        let trainer = ModelTrainer::new(TrainerConfig {
            n_folds: self.config.n_folds,
            n_repeats: self.config.n_repeats,
            seed: self.config.seed,
            k_min: self.config.k_min,
            plateau_tolerance: self.config.plateau_tolerance,
        });
        let trained = trainer.train(&train_matrix, &y_train_t, &train_groups)?;

        let predictions_t = trained.predict(&test_matrix)?;
        let predictions = state.inverse_target(&predictions_t);

        let sigma = noise_scale_from_target(&y_train);
        info!(sigma, "simulating race outcomes");
        let races = MonteCarloSimulator::new(sigma)
            .with_simulations(self.config.n_simulations)
            .with_seed(self.config.seed)
            .simulate(&predictions, &test_groups)?;

        let mut probabilities = Vec::with_capacity(test.len());
        for race in &races {
            for (&row, &p) in race.rows.iter().zip(race.probabilities.iter()) {
                probabilities.push(WinProbability {
                    race_id: race.race_id.clone(),
                    horse_id: test[row].horse_id.clone(),
                    win_prob: p,
                });
            }
        }

        let y_test = speed_targets(&test);
        let regression = regression_report(&y_test, &predictions)?;
        let probability = probability_report(&test, &test_groups, &races)?;
        info!(
            rmse = regression.rmse,
            r2 = regression.r2,
            log_loss = probability.log_loss,
            champion_model = probability.champion_model,
            "evaluation complete"
        );

        Ok(PipelineOutcome {
            probabilities,
            quality,
            regression,
            probability,
            selected_features: trained.selected().names().to_vec(),
        })
    }
}

/// Replace values still missing after imputation with the neutral
/// transformed value so predictions stay defined. Counted and logged,
/// never silent.
fn finalize_matrix(matrix: &mut AppliedMatrix) -> usize {
    let mut filled = 0usize;
    for v in matrix.data.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            filled += 1;
        }
    }
    if filled > 0 {
        warn!(filled, "substituted unresolved missing values");
    }
    filled
}
