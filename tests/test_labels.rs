//! Tests for label derivation and encoding

use smehealth::pipeline::labels::{class_distribution, derive_labels};
use smehealth::pipeline::{derive_features, derive_label, FeatureConfig, HealthCategory, LabelEncoder};

#[path = "common/mod.rs"]
mod common;

use common::{create_ledger, f64_values};

#[test]
fn test_labels_follow_accounting_rules_over_ledger() {
    let derived = derive_features(&create_ledger(150, 21), &FeatureConfig::default()).unwrap();
    let labels = derive_labels(&derived.df).unwrap();
    let net = f64_values(&derived.df, "NetProfit");
    let margin = f64_values(&derived.df, "Profit_Margin");

    for ((label, n), m) in labels.iter().zip(&net).zip(&margin) {
        let expected = if *n < 0.0 {
            HealthCategory::Risky
        } else if *m < 0.20 {
            HealthCategory::Moderate
        } else {
            HealthCategory::Healthy
        };
        assert_eq!(*label, expected);
    }
}

#[test]
fn test_loss_is_always_risky() {
    for margin in [-5.0, -0.1, 0.0, 0.25, 0.9, 10.0] {
        assert_eq!(derive_label(-500.0, margin), HealthCategory::Risky);
    }
}

#[test]
fn test_generated_ledger_covers_all_classes() {
    let derived = derive_features(&create_ledger(90, 2), &FeatureConfig::default()).unwrap();
    let labels = derive_labels(&derived.df).unwrap();
    let distribution = class_distribution(&labels);
    assert_eq!(
        distribution,
        vec![
            (HealthCategory::Risky, 30),
            (HealthCategory::Moderate, 30),
            (HealthCategory::Healthy, 30),
        ]
    );
}

#[test]
fn test_encoder_round_trip_through_json() {
    let encoder = LabelEncoder::fit(&HealthCategory::ALL).unwrap();
    let json = serde_json::to_string(&encoder).unwrap();
    let restored: LabelEncoder = serde_json::from_str(&json).unwrap();
    restored.validate().unwrap();

    for category in HealthCategory::ALL {
        let index = restored.encode(category).unwrap();
        assert_eq!(restored.decode(index).unwrap(), category);
        assert_eq!(restored.decode(index).unwrap().as_str(), category.as_str());
    }
}
