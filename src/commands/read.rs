//! `read` - refresh a resource's observed output.

use anyhow::{Context, Result, bail};
use lifecycle::Controller;
use std::path::Path;

use crate::cli::SpecArgs;
use crate::commands::{print_output, state_path};
use crate::specfile;
use crate::statefile::StateFile;
use crate::ui;

pub fn run(args: &SpecArgs, state_file: Option<&Path>) -> Result<()> {
    let spec = specfile::load(&args.spec)?;
    let path = state_path(state_file)?;
    let mut state = StateFile::load(&path)?;

    let Some(prior) = state.get(&spec.name) else {
        bail!("'{}' has no state; run apply first", spec.name);
    };

    let controller = Controller::new();
    let observed = controller
        .read(prior)
        .with_context(|| format!("Failed to read '{}'", spec.name))?;

    match observed {
        Some(result) => {
            print_output(&result.stdout, &result.stderr);

            // Refresh the observed output; the comparison baseline
            // (definitions, fingerprint) is deliberately left alone.
            let mut record = prior.clone();
            record.stdout = result.stdout;
            record.stderr = result.stderr;
            state.insert(&spec.name, record);
            state.save(&path)?;
        }
        None => {
            ui::warn(&format!(
                "'{}' declares no read command; last known output:",
                spec.name
            ));
            print_output(&prior.stdout, &prior.stderr);
        }
    }

    Ok(())
}
