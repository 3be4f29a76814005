//! Tests for IQR outlier suppression

use polars::prelude::*;
use smehealth::pipeline::columns::MONETARY_COLUMNS;
use smehealth::pipeline::outliers::{compute_fence, suppress_outliers};

#[path = "common/mod.rs"]
mod common;

use common::{create_ledger, f64_values};

#[test]
fn test_extreme_value_clipped_to_upper_fence() {
    let df = df! {
        "Revenue" => [10.0f64, 11.0, 12.0, 13.0, 14.0, 1_000_000.0],
    }
    .unwrap();

    let (clipped, fences) = suppress_outliers(&df, &["Revenue"]).unwrap();

    // q1 = 11.25, q3 = 13.75, iqr = 2.5
    let fence = &fences[0];
    assert!((fence.q1 - 11.25).abs() < 1e-9);
    assert!((fence.q3 - 13.75).abs() < 1e-9);
    assert!((fence.upper - 17.5).abs() < 1e-9);
    assert_eq!(fence.clipped, 1);

    let values = f64_values(&clipped, "Revenue");
    assert_eq!(values[..5], [10.0, 11.0, 12.0, 13.0, 14.0]);
    assert!((values[5] - 17.5).abs() < 1e-9);
}

#[test]
fn test_clipped_values_lie_within_pre_clip_fences() {
    let mut ledger = create_ledger(120, 9);
    // Inject a few wild rows
    let spikes = df! {
        "TransactionID" => ["X1", "X2"],
        "TransactionDate" => ["2024-06-01", "2024-06-02"],
        "OrderID" => ["XO1", "XO2"],
        "Revenue" => [9.0e9f64, -4.0e8],
        "COGS" => [1.0e9f64, 0.0],
        "GrossProfit" => [8.0e9f64, -4.0e8],
        "OperatingExpenses" => [2.0e9f64, 3.0e7],
        "NetProfit" => [6.0e9f64, -4.3e8],
    }
    .unwrap();
    ledger.vstack_mut(&spikes).unwrap();

    let (clipped, fences) = suppress_outliers(&ledger, &MONETARY_COLUMNS).unwrap();
    assert_eq!(fences.len(), MONETARY_COLUMNS.len());

    for fence in &fences {
        let before: Vec<Option<f64>> = f64_values(&ledger, &fence.column)
            .into_iter()
            .map(Some)
            .collect();
        let expected = compute_fence(&fence.column, &before).unwrap();
        assert_eq!(expected.lower, fence.lower);
        assert_eq!(expected.upper, fence.upper);

        for v in f64_values(&clipped, &fence.column) {
            assert!(
                v >= fence.lower && v <= fence.upper,
                "{} value {} outside [{}, {}]",
                fence.column,
                v,
                fence.lower,
                fence.upper
            );
        }
    }
}

#[test]
fn test_absent_columns_are_skipped() {
    let df = df! {
        "Revenue" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();
    let (clipped, fences) = suppress_outliers(&df, &["Revenue", "COGS"]).unwrap();
    assert_eq!(fences.len(), 1);
    assert_eq!(clipped.width(), 1);
}
