//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{CostRatioBasis, ForestParams, ScoringStrategy, TrainingConfig};

/// smehealth - Financial health classification and scoring for SME ledgers
#[derive(Parser, Debug)]
#[command(name = "smehealth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean, derive, clip and scale a ledger without training
    Preprocess {
        /// Input ledger (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (CSV or Parquet, determined by extension).
        /// Defaults to the input directory with a '_processed' suffix.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Preferred cost ratio basis: "opex" (OperatingExpenses / Revenue) or "cogs"
        #[arg(long, default_value = "opex")]
        cost_ratio_basis: CostRatioBasis,
    },

    /// Train the classifier on a historical ledger and persist the artifact bundle
    Train(TrainArgs),

    /// Classify and score a ledger with a trained artifact bundle
    Score {
        /// Input ledger (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact directory written by `train`
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Output file path (CSV or Parquet, determined by extension).
        /// Defaults to the input directory with a '_scored' suffix.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scoring strategy: "adjusted" (base 50 with adjustments) or "tiered" (35/25/15 tiers)
        #[arg(long, default_value = "adjusted")]
        strategy: ScoringStrategy,

        /// Write the batch summary as JSON to this path
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Write the flat scored records as JSON to this path
        #[arg(long)]
        records: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Historical ledger (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Artifact directory to write
    #[arg(short, long, default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value = "300", value_parser = validate_trees)]
    pub trees: usize,

    /// Maximum tree depth (0 = unlimited)
    #[arg(long, default_value = "12")]
    pub max_depth: usize,

    /// Random seed for the split and the bootstrap samples
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Hold-out fraction for evaluation (exclusive 0.0 to 1.0)
    #[arg(long, default_value = "0.25", value_parser = validate_test_fraction)]
    pub test_fraction: f64,

    /// Classes with fewer samples than this raise an imbalance warning
    #[arg(long, default_value = "10")]
    pub min_class_samples: usize,

    /// Preferred cost ratio basis: "opex" or "cogs"
    #[arg(long, default_value = "opex")]
    pub cost_ratio_basis: CostRatioBasis,

    /// Ordered classifier feature columns (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "Revenue,COGS,OperatingExpenses,GrossProfit,Cost_Ratio"
    )]
    pub features: Vec<String>,

    /// Disable balanced class weighting
    #[arg(long, default_value = "false")]
    pub no_balance: bool,

    /// Evaluation report path (defaults to <artifacts>/evaluation.json)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

impl TrainArgs {
    pub fn training_config(&self) -> TrainingConfig {
        let mut config = TrainingConfig {
            forest: ForestParams {
                n_trees: self.trees,
                max_depth: (self.max_depth > 0).then_some(self.max_depth),
                seed: self.seed,
                balanced: !self.no_balance,
            },
            test_fraction: self.test_fraction,
            feature_columns: self.features.iter().map(|f| f.trim().to_string()).collect(),
            min_class_samples: self.min_class_samples,
            ..Default::default()
        };
        config.features.cost_ratio_basis = self.cost_ratio_basis;
        config
    }

    pub fn report_path(&self) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| self.artifacts.join("evaluation.json"))
    }
}

/// Derive an output path next to `input` with a suffix on the file stem
pub fn derived_output_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    parent.join(format!("{}_{}.{}", stem, suffix, extension))
}

/// Validator for the test fraction parameter
fn validate_test_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_fraction must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

/// Validator for the tree count parameter
fn validate_trees(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("trees must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_test_fraction() {
        assert_eq!(validate_test_fraction("0.25"), Ok(0.25));
        assert!(validate_test_fraction("0").is_err());
        assert!(validate_test_fraction("1.0").is_err());
        assert!(validate_test_fraction("abc").is_err());
    }

    #[test]
    fn test_validate_trees() {
        assert_eq!(validate_trees("5"), Ok(5));
        assert!(validate_trees("0").is_err());
    }

    #[test]
    fn test_derived_output_path() {
        let path = derived_output_path(Path::new("/data/ledger.csv"), "scored");
        assert_eq!(path, PathBuf::from("/data/ledger_scored.csv"));
    }

    #[test]
    fn test_train_args_map_to_config() {
        let cli = Cli::parse_from([
            "smehealth",
            "train",
            "-i",
            "ledger.csv",
            "--trees",
            "50",
            "--max-depth",
            "0",
            "--cost-ratio-basis",
            "cogs",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train subcommand");
        };
        let config = args.training_config();
        assert_eq!(config.forest.n_trees, 50);
        assert_eq!(config.forest.max_depth, None);
        assert_eq!(config.features.cost_ratio_basis, CostRatioBasis::Cogs);
        assert_eq!(config.feature_columns.len(), 5);
        assert_eq!(args.report_path(), PathBuf::from("artifacts/evaluation.json"));
    }
}
