//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smehealth::pipeline::{ForestParams, TrainingConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// Canonical header line of a raw ledger
pub const CANONICAL_HEADER: &str =
    "TransactionID,TransactionDate,OrderID,Revenue,COGS,GrossProfit,OperatingExpenses,NetProfit";

/// Generate a synthetic ledger with the eight canonical columns.
///
/// Rows cycle through healthy, moderate and loss-making records. COGS is
/// always 25-35% of revenue, and the net margin band of each kind puts its
/// `OperatingExpenses / Revenue` ratio in a disjoint range:
/// - healthy: margin 25-35%, cost ratio 0.30-0.50
/// - moderate: margin 5-15%, cost ratio 0.50-0.70
/// - risky: margin -25 to -5%, cost ratio 0.70-1.00
pub fn create_ledger(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(rows);
    let mut dates = Vec::with_capacity(rows);
    let mut orders = Vec::with_capacity(rows);
    let mut revenue = Vec::with_capacity(rows);
    let mut cogs = Vec::with_capacity(rows);
    let mut gross = Vec::with_capacity(rows);
    let mut opex = Vec::with_capacity(rows);
    let mut net = Vec::with_capacity(rows);

    for i in 0..rows {
        let rev: f64 = round2(rng.gen_range(5_000.0..200_000.0));
        let cogs_frac: f64 = rng.gen_range(0.25..0.35);
        let margin: f64 = match i % 3 {
            0 => rng.gen_range(0.25..0.35),
            1 => rng.gen_range(0.05..0.15),
            _ => rng.gen_range(-0.25..-0.05),
        };

        let c = round2(rev * cogs_frac);
        let g = round2(rev - c);
        let n = round2(rev * margin);
        let o = round2(g - n);

        ids.push(format!("T{:05}", i));
        dates.push(format!("2024-{:02}-{:02}", (i % 12) + 1, (i % 28) + 1));
        orders.push(format!("O{:05}", i / 2));
        revenue.push(rev);
        cogs.push(c);
        gross.push(g);
        opex.push(o);
        net.push(n);
    }

    df! {
        "TransactionID" => ids,
        "TransactionDate" => dates,
        "OrderID" => orders,
        "Revenue" => revenue,
        "COGS" => cogs,
        "GrossProfit" => gross,
        "OperatingExpenses" => opex,
        "NetProfit" => net,
    }
    .unwrap()
}

/// The reference record: margin 0.25, opex cost ratio 0.35
pub fn reference_record() -> DataFrame {
    df! {
        "TransactionID" => ["REF-1"],
        "TransactionDate" => ["2024-03-15"],
        "OrderID" => ["ORD-1"],
        "Revenue" => [100_000.0f64],
        "COGS" => [40_000.0f64],
        "GrossProfit" => [60_000.0f64],
        "OperatingExpenses" => [35_000.0f64],
        "NetProfit" => [25_000.0f64],
    }
    .unwrap()
}

/// Training configuration small enough for fast tests
pub fn fast_training_config() -> TrainingConfig {
    TrainingConfig {
        forest: ForestParams {
            n_trees: 25,
            max_depth: Some(6),
            seed: 42,
            balanced: true,
        },
        ..Default::default()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Create a temporary CSV file from a DataFrame
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.csv");

    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, path)
}

/// Create a temporary Parquet file from a DataFrame
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.parquet");

    let file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, path)
}

/// Write raw text to a temporary CSV file
pub fn create_temp_csv_text(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raw.csv");
    std::fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

/// Assert that DataFrame contains all expected columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in expected_cols {
        assert!(
            actual.contains(&col.to_string()),
            "Expected column '{}' not found. Available: {:?}",
            col,
            actual
        );
    }
}

/// Read a numeric column as f64 values
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}
