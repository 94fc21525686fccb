//! Furlong - race win-probability estimation engine
//!
//! Estimates each horse's race-winning probability from historical
//! performance data in three stages:
//! - Leakage-safe feature engineering and transformation, fitted on
//!   training data and applied unchanged to unseen data
//! - Linear model fitting with permutation-importance feature selection
//!   under race-grouped cross-validation
//! - Monte Carlo simulation converting point predictions into
//!   normalized per-race win-probability vectors
//!
//! # Modules
//!
//! - [`data`] - Entry schema, partition cleaning, race grouping, CSV I/O
//! - [`features`] - Race-relative feature engineering
//! - [`transform`] - Imputation, power transforms, scaling, encoding, pruning
//! - [`model`] - OLS regression, grouped cross-validation, feature selection
//! - [`simulate`] - Monte Carlo win-probability engine
//! - [`evaluate`] - Regression and probabilistic accuracy metrics
//! - [`pipeline`] - End-to-end orchestration

pub mod error;

pub mod data;
pub mod features;
pub mod transform;
pub mod model;
pub mod simulate;
pub mod evaluate;
pub mod pipeline;

pub use error::{FurlongError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{FurlongError, Result};

    pub use crate::data::{DataQualityReport, Entry, RaceGroups};

    pub use crate::features::{FeatureEngineer, FeatureFrame};

    pub use crate::transform::{FittedTransformState, Transformer};

    pub use crate::model::{
        GroupKFold, LinearRegression, ModelTrainer, PermutationImportance, SelectedFeatureSet,
        TrainedModel, TrainerConfig,
    };

    pub use crate::simulate::{MonteCarloSimulator, RaceProbabilities};

    pub use crate::evaluate::{ProbabilityReport, RegressionReport};

    pub use crate::pipeline::{PipelineConfig, PipelineOutcome, RacePipeline, WinProbability};
}
