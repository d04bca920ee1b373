//! `destroy` - tear a resource down and drop its record.

use anyhow::{Context, Result};
use lifecycle::Controller;
use std::path::Path;

use crate::cli::DestroyArgs;
use crate::commands::state_path;
use crate::specfile;
use crate::statefile::StateFile;
use crate::ui;

pub fn run(args: &DestroyArgs, state_file: Option<&Path>) -> Result<()> {
    let spec = specfile::load(&args.spec)?;
    let path = state_path(state_file)?;
    let mut state = StateFile::load(&path)?;

    let Some(prior) = state.get(&spec.name) else {
        ui::info(&format!("'{}' has no state; nothing to destroy", spec.name));
        return Ok(());
    };

    let controller = Controller::new();
    match controller.delete(prior) {
        Ok(Some(_)) => ui::success(&format!("Deleted '{}'", spec.name)),
        Ok(None) => ui::info(&format!(
            "'{}' declares no delete command; dropping state only",
            spec.name
        )),
        // Delete failures are not retried here: re-running arbitrary shell
        // commands is an operator decision. --force drops the record anyway.
        Err(err) if args.force => {
            ui::warn(&format!("Delete command failed, dropping state anyway: {err}"));
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Failed to delete '{}' (state kept; --force to drop)", spec.name)
            });
        }
    }

    state.remove(&spec.name);
    state.save(&path)?;
    Ok(())
}
