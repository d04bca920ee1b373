//! `plan` - preview the apply decision without converging.

use anyhow::{Context, Result};
use lifecycle::Controller;
use std::path::Path;

use crate::cli::SpecArgs;
use crate::commands::state_path;
use crate::specfile;
use crate::statefile::StateFile;
use crate::ui;

pub fn run(args: &SpecArgs, state_file: Option<&Path>) -> Result<()> {
    let spec = specfile::load(&args.spec)?;
    let path = state_path(state_file)?;
    let state = StateFile::load(&path)?;

    match state.get(&spec.name) {
        None => {
            // Normalize up front so a malformed spec fails here, not mid-apply.
            lifecycle::normalize(spec.resource)
                .with_context(|| format!("Invalid spec for '{}'", spec.name))?;
            ui::info(&format!("'{}' would be created", spec.name));
        }
        Some(prior) => {
            let controller = Controller::new();
            let needs_update = controller
                .should_update(prior, spec.resource)
                .with_context(|| format!("Change detection failed for '{}'", spec.name))?;
            if needs_update {
                ui::info(&format!("'{}' would be updated", spec.name));
            } else {
                ui::success(&format!("'{}' is up to date", spec.name));
            }
        }
    }

    Ok(())
}
