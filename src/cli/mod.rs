//! CLI module - argument parsing, subcommands and interactive prompts

mod args;
pub mod preprocess;
mod prompts;
pub mod score;
pub mod train;

pub use args::{derived_output_path, Cli, Commands, TrainArgs};
pub use prompts::*;
