//! Batch inference against a loaded artifact bundle
//!
//! Inference never refits anything: records are cleaned and derived, then
//! projected onto the bundle's feature list, scaled with the stored scaler
//! and classified. The rule-based score is computed from the unscaled
//! derived ratios. Inference batches are not outlier-clipped.

use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::Serialize;

use super::artifacts::ArtifactBundle;
use super::columns::*;
use super::error::{HealthError, PipelineWarning, Result};
use super::features::{derive_features, CostRatioDefinition, FeatureConfig};
use super::labels::HealthCategory;
use super::schema::normalize_schema;
use super::scoring::ScoringStrategy;

/// One scored row in a storage-friendly flat shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub transaction_id: Option<String>,
    pub transaction_date: Option<String>,
    pub revenue: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
    pub cost_ratio: f64,
    pub loss_flag: bool,
    pub health_status: HealthCategory,
    pub confidence: f64,
    pub health_score: u8,
}

/// Result of scoring one batch
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    /// Input columns plus derived and scored columns
    pub table: DataFrame,
    pub records: Vec<ScoredRecord>,
    pub strategy: ScoringStrategy,
    pub cost_ratio: CostRatioDefinition,
    pub warnings: Vec<PipelineWarning>,
}

impl ScoredBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Project a table onto `columns`, in order, as a dense matrix.
///
/// Fails with a schema error listing every absent column. Missing values
/// become 0.
pub fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let missing: Vec<&String> = columns.iter().filter(|c| !has_column(df, c)).collect();
    if !missing.is_empty() {
        return Err(HealthError::missing_columns(missing));
    }

    let mut matrix = Array2::<f64>::zeros((df.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        let values = numeric_values_or_zero(df, name)?;
        for (row, v) in values.into_iter().enumerate() {
            matrix[[row, j]] = v;
        }
    }
    Ok(matrix)
}

/// Round to two decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify and score a raw batch
pub fn score_batch(
    raw: &DataFrame,
    bundle: &ArtifactBundle,
    strategy: ScoringStrategy,
) -> Result<ScoredBatch> {
    bundle.validate()?;

    let normalized = normalize_schema(raw)?;
    let config = FeatureConfig {
        cost_ratio_basis: bundle.metadata.cost_ratio_basis,
    };
    let derived = derive_features(&normalized.df, &config)?;

    let mut warnings = normalized.warnings;
    warnings.extend(derived.warnings);

    let features = feature_matrix(&derived.df, &bundle.feature_columns)?;
    let scaled = bundle.scaler.transform(&features)?;
    let proba = bundle.classifier.predict_proba(&scaled)?;

    let mut statuses = Vec::with_capacity(proba.nrows());
    let mut confidences = Vec::with_capacity(proba.nrows());
    for row in proba.axis_iter(Axis(0)) {
        let (class, p) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });
        statuses.push(bundle.encoder.decode(class)?);
        confidences.push(round2(p.clamp(0.0, 1.0)));
    }

    let df = &derived.df;
    let margin = numeric_values_or_zero(df, PROFIT_MARGIN)?;
    let cost_ratio = numeric_values_or_zero(df, COST_RATIO)?;
    let net = numeric_values_or_zero(df, NET_PROFIT)?;
    let revenue = if has_column(df, REVENUE) {
        numeric_values_or_zero(df, REVENUE)?
    } else {
        vec![0.0; df.height()]
    };

    let scores: Vec<u8> = (0..df.height())
        .map(|i| strategy.score(margin[i], cost_ratio[i], net[i]))
        .collect();

    let ids = optional_strings(df, TRANSACTION_ID)?;
    let dates = optional_strings(df, TRANSACTION_DATE)?;

    let records: Vec<ScoredRecord> = (0..df.height())
        .map(|i| ScoredRecord {
            transaction_id: ids[i].clone(),
            transaction_date: dates[i].clone(),
            revenue: revenue[i],
            net_profit: net[i],
            profit_margin: margin[i],
            cost_ratio: cost_ratio[i],
            loss_flag: net[i] < 0.0,
            health_status: statuses[i],
            confidence: confidences[i],
            health_score: scores[i],
        })
        .collect();

    let mut table = derived.df;
    let status_names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    table.with_column(Column::new(HEALTH_STATUS.into(), status_names))?;
    table.with_column(Column::new(CONFIDENCE.into(), confidences))?;
    let score_values: Vec<i32> = scores.iter().map(|&s| i32::from(s)).collect();
    table.with_column(Column::new(HEALTH_SCORE.into(), score_values))?;

    tracing::info!(
        rows = records.len(),
        strategy = %strategy,
        cost_ratio = %derived.cost_ratio,
        "Scored batch"
    );

    Ok(ScoredBatch {
        table,
        records,
        strategy,
        cost_ratio: derived.cost_ratio,
        warnings,
    })
}

fn optional_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if has_column(df, name) {
        string_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_matrix_orders_and_fills() {
        let df = df![
            "b" => [Some(1.0), None],
            "a" => [3.0, 4.0],
        ]
        .unwrap();
        let m = feature_matrix(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(m, ndarray::array![[3.0, 1.0], [4.0, 0.0]]);
    }

    #[test]
    fn test_feature_matrix_lists_all_missing() {
        let df = df!["a" => [1.0]].unwrap();
        let err = feature_matrix(&df, &["x".to_string(), "a".to_string(), "y".to_string()])
            .unwrap_err();
        match err {
            HealthError::Schema { missing } => assert_eq!(missing, vec!["x", "y"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.666), 0.67);
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(0.004), 0.0);
    }
}
