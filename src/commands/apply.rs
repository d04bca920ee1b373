//! `apply` - converge one resource to its declared spec.

use anyhow::{Context, Result};
use lifecycle::Controller;
use std::path::Path;

use crate::cli::ApplyArgs;
use crate::commands::{print_output, state_path};
use crate::specfile;
use crate::statefile::StateFile;
use crate::ui;

pub fn run(args: &ApplyArgs, state_file: Option<&Path>) -> Result<()> {
    let spec = specfile::load(&args.spec)?;
    let path = state_path(state_file)?;
    let mut state = StateFile::load(&path)?;
    let controller = Controller::new();

    match state.get(&spec.name) {
        None => {
            if args.dry_run {
                ui::info(&format!("Would create '{}'", spec.name));
                return Ok(());
            }

            let record = controller
                .create(spec.resource)
                .with_context(|| format!("Failed to create '{}'", spec.name))?;
            print_output(&record.stdout, &record.stderr);

            state.insert(&spec.name, record);
            state.save(&path)?;
            ui::success(&format!("Created '{}'", spec.name));
        }
        Some(prior) => {
            let needs_update = controller
                .should_update(prior, spec.resource.clone())
                .with_context(|| format!("Change detection failed for '{}'", spec.name))?;

            if !needs_update {
                ui::info(&format!("'{}' is up to date", spec.name));
                return Ok(());
            }
            if args.dry_run {
                ui::info(&format!("Would update '{}'", spec.name));
                return Ok(());
            }

            // On failure the prior record stays in place untouched.
            let record = controller
                .update(spec.resource)
                .with_context(|| format!("Failed to update '{}'", spec.name))?;
            print_output(&record.stdout, &record.stderr);

            state.insert(&spec.name, record);
            state.save(&path)?;
            ui::success(&format!("Updated '{}'", spec.name));
        }
    }

    Ok(())
}
