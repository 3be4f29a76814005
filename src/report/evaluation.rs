//! Hold-out evaluation report produced by training

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::classifier::{ClassMetrics, ClassificationMetrics};
use crate::pipeline::labels::HealthCategory;

/// Training-set count of one ground-truth category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub label: HealthCategory,
    pub count: usize,
}

/// Importance of one classifier feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Diagnostics from one training run. Logged and exported, never consumed
/// by inference.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion: Vec<Vec<usize>>,
    pub class_distribution: Vec<ClassCount>,
    /// Sorted by descending importance
    pub feature_importances: Vec<FeatureImportance>,
    pub n_train: usize,
    pub n_test: usize,
    pub n_trees: usize,
    pub cost_ratio_definition: String,
}

impl EvaluationReport {
    pub fn new(
        metrics: ClassificationMetrics,
        class_distribution: &[(HealthCategory, usize)],
        feature_columns: &[String],
        importances: &[f64],
        split: (usize, usize),
        n_trees: usize,
        cost_ratio_definition: String,
    ) -> Self {
        Self {
            accuracy: metrics.accuracy,
            per_class: metrics.per_class,
            macro_precision: metrics.macro_precision,
            macro_recall: metrics.macro_recall,
            macro_f1: metrics.macro_f1,
            confusion: metrics.confusion,
            class_distribution: class_distribution
                .iter()
                .map(|&(label, count)| ClassCount { label, count })
                .collect(),
            feature_importances: rank_importances(feature_columns, importances),
            n_train: split.0,
            n_test: split.1,
            n_trees,
            cost_ratio_definition,
        }
    }

    /// Write the headline metrics to the log
    pub fn log(&self) {
        tracing::info!(
            accuracy = self.accuracy,
            macro_f1 = self.macro_f1,
            n_train = self.n_train,
            n_test = self.n_test,
            "Classifier evaluation"
        );
        for m in &self.per_class {
            tracing::info!(
                class = %m.label,
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1_score,
                support = m.support,
                "Per-class metrics"
            );
        }
        if let Some(top) = self.feature_importances.first() {
            tracing::info!(feature = %top.feature, importance = top.importance, "Top feature");
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📈").cyan(),
            style("MODEL EVALUATION").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!(
            "      Accuracy: {}   Split: {} train / {} test   Trees: {}",
            style(format!("{:.3}", self.accuracy)).green().bold(),
            self.n_train,
            self.n_test,
            self.n_trees
        );
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Class").add_attribute(Attribute::Bold),
            Cell::new("Precision").add_attribute(Attribute::Bold),
            Cell::new("Recall").add_attribute(Attribute::Bold),
            Cell::new("F1").add_attribute(Attribute::Bold),
            Cell::new("Support").add_attribute(Attribute::Bold),
        ]);
        for m in &self.per_class {
            table.add_row(vec![
                Cell::new(&m.label).fg(category_color(&m.label)),
                metric_cell(m.precision),
                metric_cell(m.recall),
                metric_cell(m.f1_score),
                Cell::new(m.support).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new("macro avg").add_attribute(Attribute::Italic),
            metric_cell(self.macro_precision),
            metric_cell(self.macro_recall),
            metric_cell(self.macro_f1),
            Cell::new(self.n_test).set_alignment(CellAlignment::Right),
        ]);
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        println!();
        println!(
            "    {} {}",
            style("🌲").cyan(),
            style("FEATURE IMPORTANCE").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        for fi in &self.feature_importances {
            let bar = "█".repeat((fi.importance * 30.0).round() as usize);
            println!(
                "      {:<20} {:>6.3} {}",
                fi.feature,
                fi.importance,
                style(bar).cyan()
            );
        }
    }
}

fn metric_cell(value: f64) -> Cell {
    Cell::new(format!("{:.3}", value)).set_alignment(CellAlignment::Right)
}

pub(crate) fn category_color(label: &str) -> Color {
    match label {
        "Healthy" => Color::Green,
        "Moderate" => Color::Yellow,
        "Risky" => Color::Red,
        _ => Color::White,
    }
}

/// Pair importances with their feature names, most important first
pub fn rank_importances(feature_columns: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = feature_columns
        .iter()
        .zip(importances)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Export the evaluation report to JSON
pub fn export_evaluation_report(report: &EvaluationReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize evaluation report")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write evaluation report to {}",
            output_path.display()
        )
    })?;

    Ok(())
}
