//! Rule-based health scores
//!
//! Two deterministic 0-100 scoring formulas live here. They consult only the
//! derived ratios of a record, never the classifier, and remain available
//! when no model is loaded. The formulas disagree on the same input, so they
//! are exposed as separately named strategies rather than merged.

use serde::{Deserialize, Serialize};

use super::error::HealthError;
use super::labels::HealthCategory;

/// Score at or above which the tiered band is `Healthy`
pub const HEALTHY_BAND: u8 = 85;
/// Score at or above which the tiered band is `Moderate`
pub const MODERATE_BAND: u8 = 60;

/// Base-50 score adjusted by margin, cost ratio and loss.
///
/// | condition | adjustment |
/// |-----------|-----------|
/// | margin >= 0.30 | +25 |
/// | margin >= 0.15 | +15 |
/// | otherwise | -10 |
/// | cost ratio < 0.6 | +15 |
/// | cost ratio > 0.8 | -10 |
/// | net profit < 0 | -20 |
pub fn adjusted_score(profit_margin: f64, cost_ratio: f64, net_profit: f64) -> u8 {
    let mut score: i32 = 50;

    score += if profit_margin >= 0.30 {
        25
    } else if profit_margin >= 0.15 {
        15
    } else {
        -10
    };

    if cost_ratio < 0.6 {
        score += 15;
    } else if cost_ratio > 0.8 {
        score -= 10;
    }

    if net_profit < 0.0 {
        score -= 20;
    }

    score.clamp(0, 100) as u8
}

/// Tier weights of 35/25/15 for margin and for cost ratio, plus a flat 30.
pub fn tiered_score(profit_margin: f64, cost_ratio: f64) -> u8 {
    let margin_points = if profit_margin > 0.20 {
        35
    } else if profit_margin > 0.10 {
        25
    } else {
        15
    };

    let cost_points = if cost_ratio < 0.6 {
        35
    } else if cost_ratio < 0.8 {
        25
    } else {
        15
    };

    (margin_points + cost_points + 30).clamp(0, 100) as u8
}

/// Score band used for summary counts; independent of `Health_Status`
pub fn score_band(score: u8) -> HealthCategory {
    if score >= HEALTHY_BAND {
        HealthCategory::Healthy
    } else if score >= MODERATE_BAND {
        HealthCategory::Moderate
    } else {
        HealthCategory::Risky
    }
}

/// Named scoring formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    /// Base 50 with additive adjustments (authoritative)
    #[default]
    Adjusted,
    /// 35/25/15 tiers plus 30 (serving variant)
    Tiered,
}

impl ScoringStrategy {
    pub fn score(&self, profit_margin: f64, cost_ratio: f64, net_profit: f64) -> u8 {
        match self {
            ScoringStrategy::Adjusted => adjusted_score(profit_margin, cost_ratio, net_profit),
            ScoringStrategy::Tiered => tiered_score(profit_margin, cost_ratio),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringStrategy::Adjusted => "adjusted",
            ScoringStrategy::Tiered => "tiered",
        }
    }
}

impl std::fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScoringStrategy {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "adjusted" | "a" => Ok(ScoringStrategy::Adjusted),
            "tiered" | "b" => Ok(ScoringStrategy::Tiered),
            other => Err(HealthError::Configuration(format!(
                "unknown scoring strategy '{}' (expected 'adjusted' or 'tiered')",
                other
            ))),
        }
    }
}
