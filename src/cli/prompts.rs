//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()?;
    Ok(confirmed)
}

/// Prompt user to confirm replacing an existing artifact bundle
pub fn confirm_overwrite_artifacts(dir: &Path) -> Result<bool> {
    let message = format!(
        "Artifact directory {} already holds a trained model. Overwrite it?",
        dir.display()
    );
    confirm_step(&message)
}
