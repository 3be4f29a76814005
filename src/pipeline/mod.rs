//! Pipeline module - cleaning, feature derivation, training and scoring

pub mod artifacts;
pub mod classifier;
pub mod columns;
pub mod error;
pub mod features;
pub mod inference;
pub mod labels;
pub mod loader;
pub mod outliers;
pub mod preprocess;
pub mod registry;
pub mod scaling;
pub mod schema;
pub mod scoring;
pub mod training;

pub use artifacts::{ArtifactBundle, BundleMetadata};
pub use classifier::{ForestParams, HealthForest};
pub use error::{HealthError, PipelineWarning, Result};
pub use features::{derive_features, CostRatioBasis, CostRatioDefinition, FeatureConfig};
pub use inference::{score_batch, ScoredBatch, ScoredRecord};
pub use labels::{derive_label, HealthCategory, LabelEncoder};
pub use loader::*;
pub use outliers::suppress_outliers;
pub use preprocess::{preprocess, PreprocessOutcome};
pub use registry::{ArtifactRegistry, ModelHandle};
pub use scaling::MinMaxScaler;
pub use schema::normalize_schema;
pub use scoring::{adjusted_score, score_band, tiered_score, ScoringStrategy};
pub use training::{train_pipeline, train_pipeline_with_progress, TrainingConfig, TrainingOutcome};
