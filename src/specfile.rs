//! Resource spec files.
//!
//! A spec file declares one named resource in TOML or JSON (chosen by file
//! extension). Verbs accept either the bare argument-vector shorthand or the
//! full table form; `compare` is an arbitrary structured value.
//!
//! ```toml
//! name = "motd"
//! create = ["bash", "-c", "echo hello > /tmp/motd"]
//! delete = ["rm", "-f", "/tmp/motd"]
//!
//! [diff]
//! command = ["test", "-f", "/tmp/motd"]
//!
//! [compare]
//! version = 2
//! ```

use anyhow::{Context, Result, bail};
use lifecycle::RawResourceSpec;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One named resource declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecFile {
    /// Name keying the resource in the state file
    pub name: String,

    /// The declared lifecycle commands and compare value
    #[serde(flatten)]
    pub resource: RawResourceSpec,
}

/// Load a spec file, picking the format from the extension.
pub fn load(path: &Path) -> Result<SpecFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read spec file: {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let spec: SpecFile = match extension {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in spec file: {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in spec file: {}", path.display()))?,
        other => bail!(
            "Unsupported spec file extension '{}' (expected .toml or .json): {}",
            other,
            path.display()
        ),
    };

    if spec.name.is_empty() {
        bail!("Spec file declares an empty resource name: {}", path.display());
    }

    Ok(spec)
}
