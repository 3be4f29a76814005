//! `preprocess` subcommand

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::{
    dataset_stats, load_dataset, preprocess, save_dataset, CostRatioBasis, FeatureConfig,
};
use crate::utils::{
    create_spinner, finish_with_success, print_config, print_info, print_step_header,
    print_success, print_warning,
};

pub fn run_preprocess(input: &Path, output: &Path, basis: CostRatioBasis) -> Result<()> {
    print_config(
        "Preprocess",
        input,
        output,
        &[("Cost ratio basis", basis.to_string())],
    );

    print_step_header(1, "Load ledger");
    let raw = load_dataset(input)?;
    let (rows, cols, memory_mb) = dataset_stats(&raw);
    print_success(&format!(
        "Loaded {} rows x {} columns ({:.2} MB)",
        rows, cols, memory_mb
    ));

    print_step_header(2, "Clean, derive, clip and scale");
    let spinner = create_spinner("Preprocessing...");
    let config = FeatureConfig {
        cost_ratio_basis: basis,
    };
    let mut outcome = preprocess(&raw, &config)
        .with_context(|| format!("Failed to preprocess {}", input.display()))?;
    finish_with_success(&spinner, "Preprocessing complete");

    print_info(&format!("Cost ratio: {}", outcome.cost_ratio));
    if outcome.duplicates_removed > 0 {
        print_info(&format!("Removed {} duplicate row(s)", outcome.duplicates_removed));
    }
    for fence in &outcome.fences {
        if fence.clipped > 0 {
            println!(
                "      {} {} value(s) clipped to [{:.2}, {:.2}]",
                style(&fence.column).cyan(),
                style(fence.clipped).yellow().bold(),
                fence.lower,
                fence.upper
            );
        }
    }
    for warning in &outcome.warnings {
        print_warning(&warning.to_string());
    }

    print_step_header(3, "Save");
    save_dataset(&mut outcome.df, output)?;
    print_success(&format!("Wrote {}", output.display()));
    Ok(())
}
