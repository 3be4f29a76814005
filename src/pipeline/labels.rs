//! Health categories, ground-truth labelling and label encoding
//!
//! Labels are derived from accounting rules and only used to build training
//! targets. The encoder maps category names to class indices and is stored
//! with the model so predictions can be decoded at inference.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::{numeric_values_or_zero, NET_PROFIT, PROFIT_MARGIN};
use super::error::{HealthError, Result};

/// Profit margin below which a profitable record is only `Moderate`
pub const MODERATE_MARGIN_THRESHOLD: f64 = 0.20;

/// Financial health category, ordered by increasing health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HealthCategory {
    Risky,
    Moderate,
    Healthy,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 3] = [
        HealthCategory::Risky,
        HealthCategory::Moderate,
        HealthCategory::Healthy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCategory::Risky => "Risky",
            HealthCategory::Moderate => "Moderate",
            HealthCategory::Healthy => "Healthy",
        }
    }
}

impl std::fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HealthCategory {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Risky" => Ok(HealthCategory::Risky),
            "Moderate" => Ok(HealthCategory::Moderate),
            "Healthy" => Ok(HealthCategory::Healthy),
            other => Err(HealthError::Configuration(format!(
                "unknown health category '{}'",
                other
            ))),
        }
    }
}

/// Ground-truth label for one derived record.
///
/// `Risky` if the record lost money, else `Moderate` if its margin is under
/// 20%, else `Healthy`.
pub fn derive_label(net_profit: f64, profit_margin: f64) -> HealthCategory {
    if net_profit < 0.0 {
        HealthCategory::Risky
    } else if profit_margin < MODERATE_MARGIN_THRESHOLD {
        HealthCategory::Moderate
    } else {
        HealthCategory::Healthy
    }
}

/// Label every row of a derived table
pub fn derive_labels(df: &DataFrame) -> Result<Vec<HealthCategory>> {
    let net = numeric_values_or_zero(df, NET_PROFIT)?;
    let margin = numeric_values_or_zero(df, PROFIT_MARGIN)?;
    Ok(net
        .iter()
        .zip(&margin)
        .map(|(&n, &m)| derive_label(n, m))
        .collect())
}

/// Count labels per category, in risk order
pub fn class_distribution(labels: &[HealthCategory]) -> Vec<(HealthCategory, usize)> {
    HealthCategory::ALL
        .iter()
        .map(|&c| (c, labels.iter().filter(|&&l| l == c).count()))
        .collect()
}

/// Bidirectional mapping between category names and class indices.
///
/// Classes are stored by name, sorted alphabetically, which is also the
/// on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the labels seen in training
    pub fn fit(labels: &[HealthCategory]) -> Result<Self> {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_str().to_string()).collect();
        classes.sort();
        classes.dedup();
        if classes.is_empty() {
            return Err(HealthError::InvalidInput(
                "cannot fit label encoder on an empty label set".to_string(),
            ));
        }
        Ok(Self { classes })
    }

    /// Check that every stored class is a known category
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(HealthError::Configuration("label encoder has no classes".to_string()));
        }
        for name in &self.classes {
            name.parse::<HealthCategory>()?;
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HealthError::Configuration(
                "label encoder classes must be sorted and unique".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class index of a category
    pub fn encode(&self, category: HealthCategory) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| c == category.as_str())
            .ok_or_else(|| {
                HealthError::Configuration(format!(
                    "category '{}' was not seen when the label encoder was fitted (classes: {:?})",
                    category, self.classes
                ))
            })
    }

    pub fn encode_all(&self, labels: &[HealthCategory]) -> Result<Vec<usize>> {
        labels.iter().map(|&l| self.encode(l)).collect()
    }

    /// Category of a class index
    pub fn decode(&self, index: usize) -> Result<HealthCategory> {
        let name = self.classes.get(index).ok_or_else(|| {
            HealthError::Configuration(format!(
                "class index {} out of range for label encoder with {} classes",
                index,
                self.classes.len()
            ))
        })?;
        name.parse()
    }
}
