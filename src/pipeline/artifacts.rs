//! Model artifact bundle
//!
//! A trained model is persisted as a directory of three JSON files:
//!
//! - `classifier.json`: bundle metadata, the fitted forest and the scaler
//! - `label_encoder.json`: class names in index order
//! - `feature_columns.json`: ordered classifier feature list
//!
//! Each file is written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::classifier::HealthForest;
use super::error::{HealthError, Result};
use super::features::CostRatioBasis;
use super::labels::LabelEncoder;
use super::scaling::MinMaxScaler;

/// Bundle layout version written by this build
pub const FORMAT_VERSION: u32 = 1;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";
pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";

/// Provenance of a trained bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub crate_version: String,
    /// Cost ratio basis the classifier was trained with
    pub cost_ratio_basis: CostRatioBasis,
    pub n_training_rows: usize,
}

impl BundleMetadata {
    pub fn new(cost_ratio_basis: CostRatioBasis, n_training_rows: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            cost_ratio_basis,
            n_training_rows,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ClassifierFile {
    metadata: BundleMetadata,
    forest: HealthForest,
    scaler: MinMaxScaler,
}

#[derive(Serialize)]
struct ClassifierFileRef<'a> {
    metadata: &'a BundleMetadata,
    forest: &'a HealthForest,
    scaler: &'a MinMaxScaler,
}

/// Everything inference needs. Immutable once built or loaded.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub metadata: BundleMetadata,
    pub classifier: HealthForest,
    pub scaler: MinMaxScaler,
    pub encoder: LabelEncoder,
    pub feature_columns: Vec<String>,
}

impl ArtifactBundle {
    /// Check the parts of the bundle agree with one another
    pub fn validate(&self) -> Result<()> {
        if self.metadata.format_version != FORMAT_VERSION {
            return Err(HealthError::Configuration(format!(
                "unsupported artifact format version {} (expected {})",
                self.metadata.format_version, FORMAT_VERSION
            )));
        }

        self.encoder.validate()?;

        if self.feature_columns.is_empty() {
            return Err(HealthError::Configuration(
                "artifact bundle has an empty feature list".to_string(),
            ));
        }
        if self.scaler.columns != self.feature_columns {
            return Err(HealthError::ArtifactMismatch {
                expected: self.feature_columns.clone(),
                found: self.scaler.columns.clone(),
            });
        }
        self.scaler.validate()?;
        if self.classifier.n_features() != self.feature_columns.len() {
            return Err(HealthError::ArtifactMismatch {
                expected: self.feature_columns.clone(),
                found: vec![format!("<classifier over {} features>", self.classifier.n_features())],
            });
        }
        if self.classifier.n_classes() != self.encoder.n_classes() {
            return Err(HealthError::ArtifactMismatch {
                expected: self.encoder.classes().to_vec(),
                found: vec![format!("<classifier over {} classes>", self.classifier.n_classes())],
            });
        }
        Ok(())
    }

    /// Write the bundle into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(dir)?;

        write_json_atomic(
            &dir.join(CLASSIFIER_FILE),
            &ClassifierFileRef {
                metadata: &self.metadata,
                forest: &self.classifier,
                scaler: &self.scaler,
            },
            false,
        )?;
        write_json_atomic(&dir.join(LABEL_ENCODER_FILE), &self.encoder, true)?;
        write_json_atomic(&dir.join(FEATURE_COLUMNS_FILE), &self.feature_columns, true)?;

        tracing::info!(dir = %dir.display(), "Saved artifact bundle");
        Ok(())
    }

    /// Load and validate a bundle from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let classifier: ClassifierFile = read_json(&dir.join(CLASSIFIER_FILE))?;
        let encoder: LabelEncoder = read_json(&dir.join(LABEL_ENCODER_FILE))?;
        let feature_columns: Vec<String> = read_json(&dir.join(FEATURE_COLUMNS_FILE))?;

        let bundle = Self {
            metadata: classifier.metadata,
            classifier: classifier.forest,
            scaler: classifier.scaler,
            encoder,
            feature_columns,
        };
        bundle.validate()?;

        tracing::info!(
            dir = %dir.display(),
            trained_at = %bundle.metadata.trained_at,
            trees = bundle.classifier.n_trees(),
            "Loaded artifact bundle"
        );
        Ok(bundle)
    }

    /// True if `dir` already holds any bundle file
    pub fn exists(dir: &Path) -> bool {
        [CLASSIFIER_FILE, LABEL_ENCODER_FILE, FEATURE_COLUMNS_FILE]
            .iter()
            .any(|f| dir.join(f).exists())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        if pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HealthError::Configuration(format!("artifact file not found: {}", path.display()))
        } else {
            HealthError::Io(e)
        }
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
