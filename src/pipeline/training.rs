//! Training orchestration
//!
//! Runs the full training path over a historical ledger:
//! clean, derive, label, clip, split, scale, fit, evaluate. Labels are taken
//! from the derived values before clipping so that fencing can never move a
//! record across a label boundary.

use indicatif::ProgressBar;
use ndarray::{Array1, Axis};
use polars::prelude::*;

use super::artifacts::{ArtifactBundle, BundleMetadata};
use super::classifier::{classification_metrics, stratified_split, ForestParams, HealthForest};
use super::columns::{DEFAULT_FEATURE_COLUMNS, MONETARY_COLUMNS};
use super::error::{HealthError, PipelineWarning, Result};
use super::features::{derive_features, CostRatioDefinition, FeatureConfig};
use super::inference::feature_matrix;
use super::labels::{class_distribution, derive_labels, HealthCategory, LabelEncoder};
use super::outliers::{suppress_outliers, IqrFence};
use super::scaling::MinMaxScaler;
use super::schema::normalize_schema;
use crate::report::evaluation::EvaluationReport;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub forest: ForestParams,
    /// Hold-out fraction for evaluation, in (0, 1)
    pub test_fraction: f64,
    /// Ordered classifier feature list
    pub feature_columns: Vec<String>,
    /// Classes with fewer training samples raise an imbalance warning
    pub min_class_samples: usize,
    pub features: FeatureConfig,
    /// Columns clipped to their IQR fences
    pub outlier_columns: Vec<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_fraction: 0.25,
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            min_class_samples: 10,
            features: FeatureConfig::default(),
            outlier_columns: MONETARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(HealthError::Configuration(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.feature_columns.is_empty() {
            return Err(HealthError::Configuration(
                "at least one feature column is required".to_string(),
            ));
        }
        if self.forest.n_trees == 0 {
            return Err(HealthError::Configuration(
                "forest needs at least one tree".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub evaluation: EvaluationReport,
    pub class_distribution: Vec<(HealthCategory, usize)>,
    pub fences: Vec<IqrFence>,
    pub cost_ratio: CostRatioDefinition,
    pub warnings: Vec<PipelineWarning>,
}

pub fn train_pipeline(raw: &DataFrame, config: &TrainingConfig) -> Result<TrainingOutcome> {
    train_pipeline_with_progress(raw, config, &ProgressBar::hidden())
}

/// Train, reporting per-tree progress on `pb`
pub fn train_pipeline_with_progress(
    raw: &DataFrame,
    config: &TrainingConfig,
    pb: &ProgressBar,
) -> Result<TrainingOutcome> {
    config.validate()?;

    let normalized = normalize_schema(raw)?;
    let derived = derive_features(&normalized.df, &config.features)?;
    let mut warnings = normalized.warnings;
    warnings.extend(derived.warnings);

    let n_rows = derived.df.height();
    if n_rows == 0 {
        return Err(HealthError::InvalidInput(
            "training data has no rows after cleaning".to_string(),
        ));
    }

    let labels = derive_labels(&derived.df)?;
    let distribution = class_distribution(&labels);
    for &(class, count) in &distribution {
        if count > 0 && count < config.min_class_samples {
            let warning = PipelineWarning::TrainingDataImbalance {
                class: class.to_string(),
                count,
            };
            warning.emit();
            warnings.push(warning);
        }
    }

    let outlier_columns: Vec<&str> = config.outlier_columns.iter().map(|c| c.as_str()).collect();
    let (clipped, fences) = suppress_outliers(&derived.df, &outlier_columns)?;

    let features = feature_matrix(&clipped, &config.feature_columns)?;

    let encoder = LabelEncoder::fit(&labels)?;
    let targets = encoder.encode_all(&labels)?;
    let (train_idx, test_idx) =
        stratified_split(&targets, config.test_fraction, config.forest.seed)?;

    let x_train = features.select(Axis(0), &train_idx);
    let x_test = features.select(Axis(0), &test_idx);
    let y_train: Array1<usize> = train_idx.iter().map(|&i| targets[i]).collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| targets[i]).collect();

    let scaler = MinMaxScaler::fit(&x_train, &config.feature_columns)?;
    let x_train = scaler.transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    tracing::info!(
        rows = n_rows,
        train = train_idx.len(),
        test = test_idx.len(),
        trees = config.forest.n_trees,
        "Fitting classifier"
    );

    let forest = HealthForest::fit_with_progress(
        &x_train,
        &y_train,
        encoder.n_classes(),
        &config.forest,
        pb,
    )?;

    let predictions = forest.predict(&x_test)?;
    let metrics = classification_metrics(&y_test, &predictions, encoder.classes());

    let evaluation = EvaluationReport::new(
        metrics,
        &distribution,
        &config.feature_columns,
        forest.feature_importances(),
        (train_idx.len(), test_idx.len()),
        forest.n_trees(),
        derived.cost_ratio.to_string(),
    );
    evaluation.log();

    let basis = match derived.cost_ratio {
        CostRatioDefinition::Computed(basis) => basis,
        CostRatioDefinition::Supplied => config.features.cost_ratio_basis,
    };

    let bundle = ArtifactBundle {
        metadata: BundleMetadata::new(basis, train_idx.len()),
        classifier: forest,
        scaler,
        encoder,
        feature_columns: config.feature_columns.clone(),
    };
    bundle.validate()?;

    Ok(TrainingOutcome {
        bundle,
        evaluation,
        class_distribution: distribution,
        fences,
        cost_ratio: derived.cost_ratio,
        warnings,
    })
}
