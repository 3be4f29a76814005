//! `train` subcommand

use anyhow::{Context, Result};

use super::args::TrainArgs;
use super::prompts::confirm_overwrite_artifacts;
use crate::pipeline::{
    dataset_stats, load_dataset, train_pipeline_with_progress, ArtifactBundle,
};
use crate::report::export_evaluation_report;
use crate::utils::{
    create_forest_progress, finish_with_success, print_config, print_info, print_step_header,
    print_success, print_warning,
};

/// Returns false if the user declined to overwrite existing artifacts
pub fn run_train(args: &TrainArgs) -> Result<bool> {
    let config = args.training_config();

    print_config(
        "Train",
        &args.input,
        &args.artifacts,
        &[
            ("Trees", config.forest.n_trees.to_string()),
            (
                "Max depth",
                config
                    .forest
                    .max_depth
                    .map_or_else(|| "unlimited".to_string(), |d| d.to_string()),
            ),
            ("Seed", config.forest.seed.to_string()),
            ("Test fraction", format!("{:.2}", config.test_fraction)),
            ("Cost ratio basis", config.features.cost_ratio_basis.to_string()),
            ("Features", config.feature_columns.join(",")),
        ],
    );

    if ArtifactBundle::exists(&args.artifacts)
        && !args.no_confirm
        && !confirm_overwrite_artifacts(&args.artifacts)?
    {
        println!("Cancelled by user.");
        return Ok(false);
    }

    print_step_header(1, "Load ledger");
    let raw = load_dataset(&args.input)?;
    let (rows, cols, memory_mb) = dataset_stats(&raw);
    print_success(&format!(
        "Loaded {} rows x {} columns ({:.2} MB)",
        rows, cols, memory_mb
    ));

    print_step_header(2, "Fit classifier");
    let pb = create_forest_progress(config.forest.n_trees);
    let outcome = train_pipeline_with_progress(&raw, &config, &pb)
        .with_context(|| format!("Training failed on {}", args.input.display()))?;
    finish_with_success(&pb, "Forest fitted");

    for (category, count) in &outcome.class_distribution {
        print_info(&format!("{}: {} record(s)", category, count));
    }
    print_info(&format!("Cost ratio: {}", outcome.cost_ratio));
    for warning in &outcome.warnings {
        print_warning(&warning.to_string());
    }

    outcome.evaluation.display();

    print_step_header(3, "Save artifacts");
    outcome
        .bundle
        .save(&args.artifacts)
        .with_context(|| format!("Failed to save artifacts to {}", args.artifacts.display()))?;
    print_success(&format!("Artifacts written to {}", args.artifacts.display()));

    let report_path = args.report_path();
    export_evaluation_report(&outcome.evaluation, &report_path)?;
    print_success(&format!("Evaluation report written to {}", report_path.display()));
    Ok(true)
}
