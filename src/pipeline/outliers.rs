//! IQR-based outlier suppression
//!
//! Each column is clipped to `[Q1 - 1.5 * IQR, Q3 + 1.5 * IQR]`, with the
//! quartiles taken over the full column using linear interpolation. This is
//! only applied to the historical training set; small inference batches do
//! not give stable quartile estimates and are never clipped.

use polars::prelude::*;
use serde::Serialize;

use super::columns::{has_column, numeric_values};
use super::error::Result;

/// Multiplier applied to the IQR to place the fences
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Clipping fence computed for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IqrFence {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    /// Number of values moved onto a fence
    pub clipped: usize,
}

impl IqrFence {
    /// Build the fence from quartiles
    pub fn from_quartiles(column: impl Into<String>, q1: f64, q3: f64) -> Self {
        let iqr = q3 - q1;
        Self {
            column: column.into(),
            q1,
            q3,
            lower: q1 - IQR_MULTIPLIER * iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
            clipped: 0,
        }
    }

    #[inline]
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

/// Quantile of already-sorted values using linear interpolation between
/// the closest ranks (`(n - 1) * q` positioning).
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Compute the IQR fence of a column's non-missing values
pub fn compute_fence(column: &str, values: &[Option<f64>]) -> Option<IqrFence> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile_linear(&sorted, 0.25)?;
    let q3 = quantile_linear(&sorted, 0.75)?;
    Some(IqrFence::from_quartiles(column, q1, q3))
}

/// Clip each listed column to its IQR fence.
///
/// Columns not present in the table are skipped. Missing values stay
/// missing. Returns the clipped table and the fences that were applied.
pub fn suppress_outliers(df: &DataFrame, columns: &[&str]) -> Result<(DataFrame, Vec<IqrFence>)> {
    let mut out = df.clone();
    let mut fences = Vec::with_capacity(columns.len());

    for &name in columns {
        if !has_column(df, name) {
            continue;
        }

        let values = numeric_values(df, name)?;
        let Some(mut fence) = compute_fence(name, &values) else {
            continue;
        };

        let clipped: Vec<Option<f64>> = values
            .iter()
            .map(|v| {
                v.map(|x| {
                    let c = fence.clip(x);
                    if c != x {
                        fence.clipped += 1;
                    }
                    c
                })
            })
            .collect();

        tracing::debug!(
            column = name,
            lower = fence.lower,
            upper = fence.upper,
            clipped = fence.clipped,
            "Applied IQR fence"
        );

        out.with_column(Column::new(name.into(), clipped))?;
        fences.push(fence);
    }

    Ok((out, fences))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // pos = 3 * 0.25 = 0.75 -> 1 + 0.75
        assert!((quantile_linear(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile_linear(&sorted, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(quantile_linear(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_linear(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_linear(&[], 0.5), None);
    }

    #[test]
    fn test_fence_bounds() {
        let fence = IqrFence::from_quartiles("x", 10.0, 20.0);
        assert_eq!(fence.lower, -5.0);
        assert_eq!(fence.upper, 35.0);
        assert_eq!(fence.clip(100.0), 35.0);
        assert_eq!(fence.clip(-100.0), -5.0);
        assert_eq!(fence.clip(12.0), 12.0);
    }

    #[test]
    fn test_compute_fence_ignores_missing() {
        let values = vec![Some(1.0), None, Some(2.0), Some(3.0), Some(4.0)];
        let fence = compute_fence("x", &values).unwrap();
        assert!((fence.q1 - 1.75).abs() < 1e-12);
        assert!(compute_fence("y", &[None, None]).is_none());
    }
}
