//! `state` - list tracked resources.

use anyhow::Result;
use std::path::Path;

use crate::commands::state_path;
use crate::statefile::StateFile;
use crate::ui;

pub fn run(state_file: Option<&Path>) -> Result<()> {
    let path = state_path(state_file)?;
    let state = StateFile::load(&path)?;

    if state.resources.is_empty() {
        ui::info("No resources tracked");
        return Ok(());
    }

    ui::header(&format!("Resources ({})", path.display()));

    let mut names: Vec<&String> = state.resources.keys().collect();
    names.sort();

    for name in names {
        let record = &state.resources[name];
        println!();
        ui::kv("name", name);
        if let Some(program) = record.spec.create.program() {
            ui::kv("create", program);
        }
        if let Some(delete) = &record.spec.delete {
            if let Some(program) = delete.program() {
                ui::kv("delete", program);
            }
        }
        // Leading slice of the digest is plenty for eyeballing changes.
        ui::kv("fingerprint", &record.fingerprint[..12.min(record.fingerprint.len())]);
    }

    Ok(())
}
