//! `score` subcommand

use std::path::Path;

use anyhow::{Context, Result};

use crate::pipeline::{
    dataset_stats, load_dataset, save_dataset, score_batch, ArtifactRegistry, ScoringStrategy,
};
use crate::report::{export_summary, HealthSummary};
use crate::utils::{
    create_spinner, finish_with_success, print_config, print_info, print_step_header,
    print_success, print_warning,
};

pub struct ScoreOptions<'a> {
    pub input: &'a Path,
    pub artifacts: &'a Path,
    pub output: &'a Path,
    pub strategy: ScoringStrategy,
    pub summary: Option<&'a Path>,
    pub records: Option<&'a Path>,
}

pub fn run_score(opts: &ScoreOptions<'_>) -> Result<()> {
    print_config(
        "Score",
        opts.input,
        opts.output,
        &[
            ("Artifacts", opts.artifacts.display().to_string()),
            ("Strategy", opts.strategy.to_string()),
        ],
    );

    print_step_header(1, "Load model and ledger");
    let registry = ArtifactRegistry::open(opts.artifacts)
        .with_context(|| format!("Failed to load artifacts from {}", opts.artifacts.display()))?;
    let handle = registry.current();
    print_info(&format!(
        "Model trained {} with cost ratio basis '{}'",
        handle.bundle.metadata.trained_at.format("%Y-%m-%d %H:%M UTC"),
        handle.bundle.metadata.cost_ratio_basis
    ));
    let raw = load_dataset(opts.input)?;
    let (rows, cols, memory_mb) = dataset_stats(&raw);
    print_success(&format!(
        "Loaded {} rows x {} columns ({:.2} MB)",
        rows, cols, memory_mb
    ));

    print_step_header(2, "Classify and score");
    let spinner = create_spinner("Scoring...");
    let mut batch = score_batch(&raw, &handle.bundle, opts.strategy)
        .with_context(|| format!("Failed to score {}", opts.input.display()))?;
    finish_with_success(&spinner, &format!("Scored {} record(s)", batch.len()));

    for warning in &batch.warnings {
        print_warning(&warning.to_string());
    }

    let summary = HealthSummary::from_batch(&batch);
    summary.display();

    print_step_header(3, "Save");
    save_dataset(&mut batch.table, opts.output)?;
    print_success(&format!("Wrote {}", opts.output.display()));

    if let Some(path) = opts.summary {
        export_summary(&summary, path)?;
        print_success(&format!("Summary written to {}", path.display()));
    }
    if let Some(path) = opts.records {
        let json = serde_json::to_string_pretty(&batch.records)
            .context("Failed to serialize scored records")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write records to {}", path.display()))?;
        print_success(&format!("Records written to {}", path.display()));
    }
    Ok(())
}
