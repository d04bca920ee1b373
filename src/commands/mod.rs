//! CLI command implementations.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod read;
pub mod state;

use crate::statefile::StateFile;
use crate::ui;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Resolve the state file path from the flag or the default location.
pub fn state_path(flag: Option<&Path>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path.to_path_buf()),
        None => StateFile::default_path(),
    }
}

/// Print captured command output, stdout dimmed and stderr as warnings.
pub fn print_output(stdout: &str, stderr: &str) {
    for line in stdout.lines() {
        ui::dim(line);
    }
    for line in stderr.lines() {
        ui::warn(line);
    }
}
