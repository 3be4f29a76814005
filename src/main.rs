//! smehealth: SME financial health CLI
//!
//! Preprocess ledgers, train the health classifier and score new batches.

use anyhow::Result;
use clap::Parser;

use smehealth::cli::{derived_output_path, preprocess, score, train, Cli, Commands};
use smehealth::utils::{init_logging, print_banner, print_completion};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    print_banner(env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Preprocess {
            input,
            output,
            cost_ratio_basis,
        } => {
            let output = output
                .clone()
                .unwrap_or_else(|| derived_output_path(input, "processed"));
            preprocess::run_preprocess(input, &output, *cost_ratio_basis)?;
            print_completion("Preprocessing complete!");
        }
        Commands::Train(args) => {
            if train::run_train(args)? {
                print_completion("Training complete!");
            }
        }
        Commands::Score {
            input,
            artifacts,
            output,
            strategy,
            summary,
            records,
        } => {
            let output = output
                .clone()
                .unwrap_or_else(|| derived_output_path(input, "scored"));
            score::run_score(&score::ScoreOptions {
                input,
                artifacts,
                output: &output,
                strategy: *strategy,
                summary: summary.as_deref(),
                records: records.as_deref(),
            })?;
            print_completion("Scoring complete!");
        }
    }

    Ok(())
}
