//! Model training
//!
//! Ordinary least-squares regression, race-grouped cross-validation,
//! permutation-importance ranking, and top-K feature selection.

pub mod cross_validation;
pub mod importance;
pub mod linear;
pub mod trainer;

pub use cross_validation::{CVSplit, GroupKFold};
pub use importance::{ImportanceResult, PermutationImportance};
pub use linear::LinearRegression;
pub use trainer::{ModelTrainer, SelectedFeatureSet, TrainedModel, TrainerConfig};
