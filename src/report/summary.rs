//! Batch summary of scored records

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use super::evaluation::category_color;
use crate::pipeline::inference::{ScoredBatch, ScoredRecord};
use crate::pipeline::labels::HealthCategory;
use crate::pipeline::scoring::score_band;

/// Count and share of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryShare {
    pub count: usize,
    pub fraction: f64,
}

impl CategoryShare {
    fn new(count: usize, total: usize) -> Self {
        let fraction = if total > 0 {
            count as f64 / total as f64
        } else {
            0.0
        };
        Self { count, fraction }
    }
}

/// Summary handed to downstream narrative and dashboard consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    pub total_records: usize,
    /// Mean health score, one decimal place
    pub avg_health_score: f64,
    pub healthy: CategoryShare,
    pub moderate: CategoryShare,
    pub risky: CategoryShare,
    pub avg_confidence: f64,
    pub avg_profit_margin: f64,
    /// Records per score band, by health score alone
    pub score_bands: ScoreBands,
    pub strategy: String,
    pub cost_ratio_definition: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBands {
    pub healthy: usize,
    pub moderate: usize,
    pub risky: usize,
}

impl HealthSummary {
    pub fn from_batch(batch: &ScoredBatch) -> Self {
        Self::from_records(
            &batch.records,
            &batch.strategy.to_string(),
            &batch.cost_ratio.to_string(),
        )
    }

    pub fn from_records(records: &[ScoredRecord], strategy: &str, cost_ratio_definition: &str) -> Self {
        let total = records.len();
        let mean = |f: &dyn Fn(&ScoredRecord) -> f64| {
            if total == 0 {
                0.0
            } else {
                records.iter().map(f).sum::<f64>() / total as f64
            }
        };
        let count = |c: HealthCategory| records.iter().filter(|r| r.health_status == c).count();

        let mut bands = ScoreBands::default();
        for r in records {
            match score_band(r.health_score) {
                HealthCategory::Healthy => bands.healthy += 1,
                HealthCategory::Moderate => bands.moderate += 1,
                HealthCategory::Risky => bands.risky += 1,
            }
        }

        Self {
            total_records: total,
            avg_health_score: round_to(mean(&|r| f64::from(r.health_score)), 1),
            healthy: CategoryShare::new(count(HealthCategory::Healthy), total),
            moderate: CategoryShare::new(count(HealthCategory::Moderate), total),
            risky: CategoryShare::new(count(HealthCategory::Risky), total),
            avg_confidence: round_to(mean(&|r| r.confidence), 2),
            avg_profit_margin: round_to(mean(&|r| r.profit_margin), 4),
            score_bands: bands,
            strategy: strategy.to_string(),
            cost_ratio_definition: cost_ratio_definition.to_string(),
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("HEALTH SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Records").add_attribute(Attribute::Bold),
            Cell::new("Share").add_attribute(Attribute::Bold),
            Cell::new("Score band").add_attribute(Attribute::Bold),
        ]);

        let rows = [
            ("Healthy", self.healthy, self.score_bands.healthy),
            ("Moderate", self.moderate, self.score_bands.moderate),
            ("Risky", self.risky, self.score_bands.risky),
        ];
        for (label, share, band) in rows {
            table.add_row(vec![
                Cell::new(label).fg(category_color(label)),
                Cell::new(share.count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", share.fraction * 100.0))
                    .set_alignment(CellAlignment::Right),
                Cell::new(band).set_alignment(CellAlignment::Right),
            ]);
        }

        let score_color = if self.avg_health_score >= 85.0 {
            Color::Green
        } else if self.avg_health_score >= 60.0 {
            Color::Yellow
        } else {
            Color::Red
        };
        table.add_row(vec![
            Cell::new("Average score").add_attribute(Attribute::Bold),
            Cell::new(format!("{:.1}", self.avg_health_score))
                .fg(score_color)
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
        ]);

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        println!();
        println!(
            "      {} {}   {} {:.2}   {} {:.1}%",
            style("Strategy:").dim(),
            style(&self.strategy).cyan(),
            style("Avg confidence:").dim(),
            self.avg_confidence,
            style("Avg margin:").dim(),
            self.avg_profit_margin * 100.0
        );
        println!(
            "      {} {}",
            style("Cost ratio:").dim(),
            self.cost_ratio_definition
        );
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Export a batch summary to JSON
pub fn export_summary(summary: &HealthSummary, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write summary to {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: HealthCategory, score: u8, confidence: f64, margin: f64) -> ScoredRecord {
        ScoredRecord {
            transaction_id: None,
            transaction_date: None,
            revenue: 100.0,
            net_profit: margin * 100.0,
            profit_margin: margin,
            cost_ratio: 0.5,
            loss_flag: margin < 0.0,
            health_status: status,
            confidence,
            health_score: score,
        }
    }

    #[test]
    fn test_summary_counts_and_averages() {
        let records = vec![
            record(HealthCategory::Healthy, 90, 0.9, 0.3),
            record(HealthCategory::Healthy, 85, 0.8, 0.25),
            record(HealthCategory::Risky, 20, 0.7, -0.1),
        ];
        let summary = HealthSummary::from_records(&records, "adjusted", "OperatingExpenses / Revenue");

        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.avg_health_score, 65.0);
        assert_eq!(summary.healthy.count, 2);
        assert_eq!(summary.moderate.count, 0);
        assert_eq!(summary.risky.count, 1);
        assert!((summary.healthy.fraction - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.avg_confidence, 0.8);
        assert_eq!(summary.score_bands.healthy, 2);
        assert_eq!(summary.score_bands.risky, 1);
    }

    #[test]
    fn test_summary_of_empty_batch() {
        let summary = HealthSummary::from_records(&[], "tiered", "supplied by input");
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.avg_health_score, 0.0);
        assert_eq!(summary.risky.fraction, 0.0);
    }

    #[test]
    fn test_avg_score_rounded_to_one_decimal() {
        let records = vec![
            record(HealthCategory::Moderate, 60, 0.5, 0.1),
            record(HealthCategory::Moderate, 61, 0.5, 0.1),
            record(HealthCategory::Moderate, 61, 0.5, 0.1),
        ];
        let summary = HealthSummary::from_records(&records, "adjusted", "x");
        assert_eq!(summary.avg_health_score, 60.7);
    }
}
