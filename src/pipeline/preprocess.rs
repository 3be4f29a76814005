//! Standalone preprocessing of a historical ledger
//!
//! Cleans, derives, clips and min-max scales the monetary columns without
//! training, producing a table ready for external analysis.

use polars::prelude::*;

use super::columns::{has_column, MONETARY_COLUMNS};
use super::error::{HealthError, PipelineWarning, Result};
use super::features::{derive_features, CostRatioDefinition, FeatureConfig};
use super::outliers::{suppress_outliers, IqrFence};
use super::scaling::MinMaxScaler;
use super::schema::normalize_schema;

#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    pub df: DataFrame,
    pub fences: Vec<IqrFence>,
    pub scaler: MinMaxScaler,
    pub cost_ratio: CostRatioDefinition,
    pub duplicates_removed: usize,
    pub warnings: Vec<PipelineWarning>,
}

pub fn preprocess(raw: &DataFrame, config: &FeatureConfig) -> Result<PreprocessOutcome> {
    let normalized = normalize_schema(raw)?;
    let derived = derive_features(&normalized.df, config)?;
    let mut warnings = normalized.warnings;
    warnings.extend(derived.warnings);

    if derived.df.height() == 0 {
        return Err(HealthError::InvalidInput(
            "ledger has no rows after cleaning".to_string(),
        ));
    }

    let (clipped, fences) = suppress_outliers(&derived.df, &MONETARY_COLUMNS)?;

    let present: Vec<&str> = MONETARY_COLUMNS
        .iter()
        .copied()
        .filter(|c| has_column(&clipped, c))
        .collect();
    let (df, scaler) = MinMaxScaler::fit_transform_frame(&clipped, &present)?;

    tracing::info!(
        rows = df.height(),
        clipped = fences.iter().map(|f| f.clipped).sum::<usize>(),
        scaled = present.len(),
        "Preprocessed ledger"
    );

    Ok(PreprocessOutcome {
        df,
        fences,
        scaler,
        cost_ratio: derived.cost_ratio,
        duplicates_removed: normalized.duplicates_removed,
        warnings,
    })
}
