//! Unit tests for ledger loading and saving

use polars::prelude::*;
use smehealth::pipeline::{dataset_stats, load_dataset, read_csv_bytes, save_dataset};
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::{create_ledger, create_temp_csv_text, create_temp_parquet};

#[test]
fn test_load_csv_reads_every_column_as_string() {
    let (_dir, path) = create_temp_csv_text("Revenue,NetProfit\n100,25\nabc,\n");

    let df = load_dataset(&path).unwrap();

    assert_eq!(df.shape(), (2, 2));
    assert_eq!(df.column("Revenue").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("NetProfit").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_load_parquet_file() {
    let mut ledger = create_ledger(12, 1);
    let (_dir, path) = create_temp_parquet(&mut ledger);

    let df = load_dataset(&path).unwrap();

    assert_eq!(df.shape(), (12, 8));
    assert_eq!(df.column("Revenue").unwrap().dtype(), &DataType::Float64);
}

#[test]
fn test_unsupported_extension() {
    let (_dir, path) = create_temp_csv_text("a\n1\n");
    let json = path.with_extension("json");
    std::fs::rename(&path, &json).unwrap();

    let err = load_dataset(&json).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_read_csv_bytes() {
    let df = read_csv_bytes(b" Revenue ,NetProfit\n10,2\n").unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(df.get_column_names()[0].as_str(), " Revenue ");
}

#[test]
fn test_save_round_trip_csv_and_parquet() {
    let dir = TempDir::new().unwrap();
    let mut ledger = create_ledger(5, 2);

    for name in ["out.csv", "out.parquet"] {
        let path = dir.path().join(name);
        save_dataset(&mut ledger, &path).unwrap();
        let loaded = load_dataset(&path).unwrap();
        assert_eq!(loaded.shape(), (5, 8));
    }

    assert!(save_dataset(&mut ledger, &dir.path().join("out.xlsx")).is_err());
}

#[test]
fn test_dataset_stats() {
    let ledger = create_ledger(7, 3);
    let (rows, cols, memory_mb) = dataset_stats(&ledger);
    assert_eq!((rows, cols), (7, 8));
    assert!(memory_mb > 0.0);
}
