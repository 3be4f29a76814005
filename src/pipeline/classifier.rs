//! Tree-ensemble health classifier
//!
//! A bagged forest of CART decision trees (Gini impurity) from `linfa-trees`.
//! Every tree is fitted on a bootstrap sample drawn from its own RNG seeded
//! with `seed + tree_index`, so trees can be fitted in parallel and refitting
//! on identical data reproduces the identical forest. Balanced class weights
//! are applied as sample weights to counter label imbalance.

use indicatif::ProgressBar;
use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{HealthError, Result};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Seed for bootstrap sampling
    pub seed: u64,
    /// Weight classes inversely to their frequency
    pub balanced: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: Some(12),
            seed: 42,
            balanced: true,
        }
    }
}

/// Fitted forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_classes: usize,
    n_features: usize,
    feature_importances: Vec<f64>,
    params: ForestParams,
}

impl HealthForest {
    /// Fit a forest on encoded targets in `0..n_classes`
    pub fn fit(
        records: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self> {
        Self::fit_with_progress(records, targets, n_classes, params, &ProgressBar::hidden())
    }

    /// Fit a forest, advancing `pb` once per fitted tree
    pub fn fit_with_progress(
        records: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        params: &ForestParams,
        pb: &ProgressBar,
    ) -> Result<Self> {
        let n = records.nrows();
        if n == 0 {
            return Err(HealthError::InvalidInput(
                "cannot fit classifier on zero rows".to_string(),
            ));
        }
        if targets.len() != n {
            return Err(HealthError::InvalidInput(format!(
                "{} feature rows but {} targets",
                n,
                targets.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(HealthError::Configuration(
                "forest needs at least one tree".to_string(),
            ));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= n_classes) {
            return Err(HealthError::InvalidInput(format!(
                "target class {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let class_weights = if params.balanced {
            balanced_class_weights(&targets.to_vec(), n_classes)
        } else {
            vec![1.0; n_classes]
        };

        pb.set_length(params.n_trees as u64);

        let trees: Vec<DecisionTree<f64, usize>> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| -> Result<DecisionTree<f64, usize>> {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

                let x = records.select(Axis(0), &sample);
                let y = targets.select(Axis(0), &sample);
                let w: Array1<f32> = y.mapv(|c| class_weights[c] as f32);

                let dataset = Dataset::new(x, y).with_weights(w);
                let tree = DecisionTree::<f64, usize>::params()
                    .split_quality(SplitQuality::Gini)
                    .max_depth(params.max_depth)
                    .fit(&dataset)
                    .map_err(|e| HealthError::Training(format!("tree {}: {}", i, e)))?;

                pb.inc(1);
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        let feature_importances = mean_importances(&trees, records.ncols());

        Ok(Self {
            trees,
            n_classes,
            n_features: records.ncols(),
            feature_importances,
            params: params.clone(),
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Mean impurity-based importance per feature, summing to 1
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Fraction of trees voting for each class, one row per record
    pub fn predict_proba(&self, records: &Array2<f64>) -> Result<Array2<f64>> {
        if records.ncols() != self.n_features {
            return Err(HealthError::ArtifactMismatch {
                expected: vec![format!("<{} features>", self.n_features)],
                found: vec![format!("<{} features>", records.ncols())],
            });
        }

        let mut votes = Array2::<f64>::zeros((records.nrows(), self.n_classes));
        if records.nrows() == 0 || self.trees.is_empty() {
            return Ok(votes);
        }

        for tree in &self.trees {
            let predictions: Array1<usize> = tree.predict(records);
            for (row, &class) in predictions.iter().enumerate() {
                if class < self.n_classes {
                    votes[[row, class]] += 1.0;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        votes.mapv_inplace(|v| v / n_trees);
        Ok(votes)
    }

    /// Most-voted class per record; ties go to the lowest class index
    pub fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(records)?;
        Ok(proba.axis_iter(Axis(0)).map(|row| argmax(row.iter().copied())).collect())
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0usize;
    let mut best_value = f64::NEG_INFINITY;
    for (idx, v) in values.enumerate() {
        if v > best_value {
            best = idx;
            best_value = v;
        }
    }
    best
}

/// `n_samples / (n_classes_present * count_c)` per class; absent classes get 0
pub fn balanced_class_weights(targets: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &t in targets {
        if t < n_classes {
            counts[t] += 1;
        }
    }
    let present = counts.iter().filter(|&&c| c > 0).count();
    if present == 0 {
        return vec![0.0; n_classes];
    }
    let n = targets.len() as f64;
    counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                n / (present as f64 * c as f64)
            }
        })
        .collect()
}

fn mean_importances(trees: &[DecisionTree<f64, usize>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    for tree in trees {
        for (total, value) in totals.iter_mut().zip(tree.feature_importance()) {
            if value.is_finite() {
                *total += value;
            }
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}

/// Stratified train/test split over encoded targets.
///
/// Each class's rows are shuffled with the seeded RNG and
/// `round(count * test_fraction)` of them are held out, always keeping at
/// least one row of the class for training. Returns sorted
/// `(train_indices, test_indices)`.
pub fn stratified_split(
    targets: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(HealthError::Configuration(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_classes = targets.iter().copied().max().map_or(0, |m| m + 1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(targets.len());
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut rows: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == class)
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(&mut rng);

        let n_test = if rows.len() < 2 {
            0
        } else {
            ((rows.len() as f64 * test_fraction).round() as usize).min(rows.len() - 1)
        };
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Hold-out evaluation of a classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    /// `confusion[true][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

/// Compute accuracy, per-class and macro-averaged metrics
pub fn classification_metrics(
    y_true: &[usize],
    y_pred: &[usize],
    class_names: &[String],
) -> ClassificationMetrics {
    let n_classes = class_names.len();
    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            confusion[t][p] += 1;
        }
    }

    let correct: usize = (0..n_classes).map(|c| confusion[c][c]).sum();
    let accuracy = if y_true.is_empty() {
        0.0
    } else {
        correct as f64 / y_true.len() as f64
    };

    let per_class: Vec<ClassMetrics> = class_names
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let tp = confusion[c][c];
            let predicted: usize = (0..n_classes).map(|t| confusion[t][c]).sum();
            let support: usize = confusion[c].iter().sum();

            let precision = if predicted > 0 {
                tp as f64 / predicted as f64
            } else {
                0.0
            };
            let recall = if support > 0 {
                tp as f64 / support as f64
            } else {
                0.0
            };
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect();

    let mean = |f: fn(&ClassMetrics) -> f64| {
        if per_class.is_empty() {
            0.0
        } else {
            per_class.iter().map(f).sum::<f64>() / per_class.len() as f64
        }
    };

    ClassificationMetrics {
        accuracy,
        macro_precision: mean(|m| m.precision),
        macro_recall: mean(|m| m.recall),
        macro_f1: mean(|m| m.f1_score),
        per_class,
        confusion,
    }
}
