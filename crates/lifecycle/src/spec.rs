//! Resource spec model and normalization.
//!
//! A resource declares one command definition per lifecycle verb. Authors may
//! write a verb either as a full definition or as a bare argument vector;
//! [`normalize`] expands the shorthand and applies the defaulting rules so the
//! rest of the engine only ever sees the canonical [`ResourceSpec`] form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// A named lifecycle operation on a command resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
    Diff,
}

impl Verb {
    /// Lowercase name of the verb, matching its wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Diff => "diff",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verb's executable unit.
///
/// The first element of `command` is the executable; the rest are its
/// arguments. The environment entries are overlaid on the ambient environment
/// at execution time, and `timeout_secs` bounds the process's wall-clock
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    /// Ordered argument vector; must be non-empty for verbs that execute
    pub command: Vec<String>,

    /// Payload written in full to the process's standard input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,

    /// Environment variables overlaid on the ambient environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,

    /// Wall-clock deadline; on expiry the process is terminated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl CommandDefinition {
    /// Build a definition from a bare argument vector.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: args.into_iter().map(Into::into).collect(),
            stdin: None,
            environment: None,
            timeout_secs: None,
        }
    }

    /// The executable, when the command vector is non-empty.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

/// A verb definition as authored: either shorthand or the full form.
///
/// `["a", "b"]` is equivalent to `{ command = ["a", "b"] }` with no
/// stdin/environment/timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandInput {
    /// Bare argument vector shorthand
    Args(Vec<String>),
    /// Full command definition
    Full(CommandDefinition),
}

impl CommandInput {
    /// Expand shorthand into the canonical definition form.
    pub fn into_definition(self) -> CommandDefinition {
        match self {
            Self::Args(args) => CommandDefinition::from_args(args),
            Self::Full(def) => def,
        }
    }
}

impl From<CommandDefinition> for CommandInput {
    fn from(def: CommandDefinition) -> Self {
        Self::Full(def)
    }
}

/// The declared desired state of one command resource, as authored.
///
/// Every verb is optional at this stage; [`normalize`] enforces that `create`
/// is present and applies the `update` default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawResourceSpec {
    #[serde(default)]
    pub create: Option<CommandInput>,
    #[serde(default)]
    pub update: Option<CommandInput>,
    #[serde(default)]
    pub diff: Option<CommandInput>,
    #[serde(default)]
    pub read: Option<CommandInput>,
    #[serde(default)]
    pub delete: Option<CommandInput>,
    /// Opaque structured value whose fingerprint participates in change
    /// detection
    #[serde(default)]
    pub compare: Option<Value>,
}

/// The canonical form of a resource spec.
///
/// `create` and `update` are always present (`update` defaults to a copy of
/// `create`); `diff`, `read`, and `delete` stay absent when not declared,
/// because absence is meaningful for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub create: CommandDefinition,
    pub update: CommandDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<CommandDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<CommandDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<CommandDefinition>,
    /// Persisted as compact JSON text so null-bearing payloads survive
    /// formats without a null, such as the TOML state file
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::value::json_text"
    )]
    pub compare: Option<Value>,
}

impl From<ResourceSpec> for RawResourceSpec {
    fn from(spec: ResourceSpec) -> Self {
        Self {
            create: Some(spec.create.into()),
            update: Some(spec.update.into()),
            diff: spec.diff.map(Into::into),
            read: spec.read.map(Into::into),
            delete: spec.delete.map(Into::into),
            compare: spec.compare,
        }
    }
}

/// Resolve a raw spec into its canonical form.
///
/// Rules:
/// - shorthand argument vectors become full definitions;
/// - a missing `update` is set to a copy of the normalized `create`;
/// - a missing `create` fails with [`Error::MissingCreate`];
/// - every present verb must have a non-empty command vector;
/// - `diff`, `read`, and `delete` remain absent when not supplied.
pub fn normalize(raw: RawResourceSpec) -> Result<ResourceSpec> {
    let create = raw
        .create
        .ok_or(Error::MissingCreate)?
        .into_definition();
    validate(Verb::Create, &create)?;

    let update = match raw.update {
        Some(input) => {
            let def = input.into_definition();
            validate(Verb::Update, &def)?;
            def
        }
        None => create.clone(),
    };

    let diff = normalize_optional(Verb::Diff, raw.diff)?;
    let read = normalize_optional(Verb::Read, raw.read)?;
    let delete = normalize_optional(Verb::Delete, raw.delete)?;

    Ok(ResourceSpec {
        create,
        update,
        diff,
        read,
        delete,
        compare: raw.compare,
    })
}

fn normalize_optional(verb: Verb, input: Option<CommandInput>) -> Result<Option<CommandDefinition>> {
    match input {
        Some(input) => {
            let def = input.into_definition();
            validate(verb, &def)?;
            Ok(Some(def))
        }
        None => Ok(None),
    }
}

fn validate(verb: Verb, def: &CommandDefinition) -> Result<()> {
    if def.command.is_empty() {
        return Err(Error::Validation {
            verb,
            message: "command vector is empty".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_create(args: &[&str]) -> RawResourceSpec {
        RawResourceSpec {
            create: Some(CommandInput::Args(
                args.iter().map(ToString::to_string).collect(),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_shorthand_expands_to_full_definition() {
        let spec = normalize(raw_with_create(&["ls", "-lh"])).unwrap();
        assert_eq!(spec.create.command, vec!["ls", "-lh"]);
        assert!(spec.create.stdin.is_none());
        assert!(spec.create.environment.is_none());
        assert!(spec.create.timeout_secs.is_none());
    }

    #[test]
    fn test_update_defaults_to_create_by_value() {
        let spec = normalize(raw_with_create(&["echo", "hi"])).unwrap();
        assert_eq!(spec.update, spec.create);

        // Defaulting copies by value: mutating one side must not affect the other.
        let mut spec = spec;
        spec.update.command.push("extra".into());
        assert_ne!(spec.update, spec.create);
    }

    #[test]
    fn test_declared_update_is_kept() {
        let mut raw = raw_with_create(&["echo", "create"]);
        raw.update = Some(CommandInput::Args(vec!["echo".into(), "update".into()]));
        let spec = normalize(raw).unwrap();
        assert_eq!(spec.update.command, vec!["echo", "update"]);
    }

    #[test]
    fn test_missing_create_fails() {
        let err = normalize(RawResourceSpec::default()).unwrap_err();
        assert!(matches!(err, Error::MissingCreate));
    }

    #[test]
    fn test_empty_command_vector_fails_validation() {
        let mut raw = raw_with_create(&["true"]);
        raw.diff = Some(CommandInput::Args(Vec::new()));
        let err = normalize(raw).unwrap_err();
        assert!(matches!(err, Error::Validation { verb: Verb::Diff, .. }));
    }

    #[test]
    fn test_absent_verbs_stay_absent() {
        let spec = normalize(raw_with_create(&["true"])).unwrap();
        assert!(spec.diff.is_none());
        assert!(spec.read.is_none());
        assert!(spec.delete.is_none());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut raw = raw_with_create(&["touch", "/tmp/x"]);
        raw.delete = Some(CommandInput::Args(vec!["rm".into(), "/tmp/x".into()]));
        let spec = normalize(raw).unwrap();

        let again = normalize(spec.clone().into()).unwrap();
        assert_eq!(again, spec);
    }

    #[test]
    fn test_deserialize_shorthand_and_full_form_json() {
        let raw: RawResourceSpec = serde_json::from_str(
            r#"{
                "create": ["touch", "/tmp/marker"],
                "update": {
                    "command": ["bash", "-c", "echo $MODE"],
                    "environment": { "MODE": "refresh" },
                    "timeout_secs": 30
                },
                "compare": { "version": 2 }
            }"#,
        )
        .unwrap();

        let spec = normalize(raw).unwrap();
        assert_eq!(spec.create.command, vec!["touch", "/tmp/marker"]);
        assert_eq!(
            spec.update.environment.as_ref().unwrap()["MODE"],
            "refresh"
        );
        assert_eq!(spec.update.timeout_secs, Some(30));
        assert!(spec.compare.is_some());
    }

    #[test]
    fn test_compare_round_trips_through_serialized_spec() {
        let mut raw = raw_with_create(&["true"]);
        raw.compare = Some(serde_json::from_str(r#"{"pinned": null, "version": 3}"#).unwrap());
        let spec = normalize(raw).unwrap();

        // Persisted specs carry compare as JSON text; null has no TOML form.
        let text = serde_json::to_string(&spec).unwrap();
        assert!(text.contains(r#""compare":"{\"pinned\":null,\"version\":3}""#));

        let back: ResourceSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(back, spec);
    }
}
