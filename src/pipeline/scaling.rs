//! Min-max normalization of classifier features
//!
//! The scaler is fitted once on the training feature table and persisted in
//! the artifact bundle. Values outside the training range are clamped to
//! [0, 1] at inference. The rule-based score never sees scaled values.

use ndarray::{Array2, ArrayView1, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::numeric_values;
use super::error::{HealthError, Result};

/// Per-column min/max parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub columns: Vec<String>,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on a feature matrix whose columns are named by `columns`
    pub fn fit(records: &Array2<f64>, columns: &[String]) -> Result<Self> {
        if records.ncols() != columns.len() {
            return Err(HealthError::Configuration(format!(
                "scaler given {} column names for {} feature columns",
                columns.len(),
                records.ncols()
            )));
        }
        if records.nrows() == 0 {
            return Err(HealthError::InvalidInput(
                "cannot fit scaler on an empty feature table".to_string(),
            ));
        }

        let (mins, maxs): (Vec<f64>, Vec<f64>) = records
            .axis_iter(Axis(1))
            .map(column_range)
            .unzip();

        Ok(Self {
            columns: columns.to_vec(),
            mins,
            maxs,
        })
    }

    /// Check that every column has both a min and a max
    pub fn validate(&self) -> Result<()> {
        let n = self.columns.len();
        if self.mins.len() != n || self.maxs.len() != n {
            return Err(HealthError::ArtifactMismatch {
                expected: self.columns.clone(),
                found: vec![format!(
                    "<scaler with {} mins and {} maxs>",
                    self.mins.len(),
                    self.maxs.len()
                )],
            });
        }
        Ok(())
    }

    /// Scale a single value of feature `j`
    #[inline]
    pub fn scale_value(&self, j: usize, value: f64) -> f64 {
        let range = self.maxs[j] - self.mins[j];
        if !(range > 0.0) || !value.is_finite() {
            return 0.0;
        }
        ((value - self.mins[j]) / range).clamp(0.0, 1.0)
    }

    /// Scale a feature matrix laid out in `self.columns` order
    pub fn transform(&self, records: &Array2<f64>) -> Result<Array2<f64>> {
        self.validate()?;
        if records.ncols() != self.columns.len() {
            return Err(HealthError::ArtifactMismatch {
                expected: self.columns.clone(),
                found: vec![format!("<{} columns>", records.ncols())],
            });
        }
        let mut scaled = records.clone();
        for (j, mut col) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            col.mapv_inplace(|v| self.scale_value(j, v));
        }
        Ok(scaled)
    }

    /// Fit on and transform the named columns of a table in place
    pub fn fit_transform_frame(df: &DataFrame, columns: &[&str]) -> Result<(DataFrame, Self)> {
        let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let records = super::inference::feature_matrix(df, &names)?;
        let scaler = Self::fit(&records, &names)?;
        let scaled = scaler.transform_frame(df)?;
        Ok((scaled, scaler))
    }

    /// Replace the scaler's columns in a table with their scaled values
    pub fn transform_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        self.validate()?;
        let mut out = df.clone();
        for (j, name) in self.columns.iter().enumerate() {
            let values = numeric_values(df, name)?;
            let scaled: Vec<f64> = values
                .into_iter()
                .map(|v| self.scale_value(j, v.unwrap_or(0.0)))
                .collect();
            out.with_column(Column::new(name.as_str().into(), scaled))?;
        }
        Ok(out)
    }
}

fn column_range(col: ArrayView1<f64>) -> (f64, f64) {
    let finite = col.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_fit_transform_range() {
        let x = array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]];
        let scaler = MinMaxScaler::fit(&x, &names(2)).unwrap();
        let scaled = scaler.transform(&x).unwrap();
        assert_eq!(scaled, array![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let x = array![[0.0], [10.0]];
        let scaler = MinMaxScaler::fit(&x, &names(1)).unwrap();
        let unseen = array![[-5.0], [15.0], [2.5]];
        let scaled = scaler.transform(&unseen).unwrap();
        assert_eq!(scaled, array![[0.0], [1.0], [0.25]]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let x = array![[3.0], [3.0]];
        let scaler = MinMaxScaler::fit(&x, &names(1)).unwrap();
        assert_eq!(scaler.scale_value(0, 3.0), 0.0);
    }

    #[test]
    fn test_ragged_parameters_are_rejected() {
        let x = array![[0.0, 1.0, 2.0], [4.0, 5.0, 6.0]];
        let mut scaler = MinMaxScaler::fit(&x, &names(3)).unwrap();
        scaler.mins.truncate(2);

        assert!(matches!(scaler.validate(), Err(HealthError::ArtifactMismatch { .. })));
        assert!(matches!(
            scaler.transform(&x),
            Err(HealthError::ArtifactMismatch { .. })
        ));
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let x = array![[0.0, 1.0]];
        let scaler = MinMaxScaler::fit(&x, &names(2)).unwrap();
        let narrow = array![[0.0]];
        assert!(matches!(
            scaler.transform(&narrow),
            Err(HealthError::ArtifactMismatch { .. })
        ));
    }
}
