//! Lifecycle controller: the state machine behind each engine-invoked verb.
//!
//! The controller is stateless between calls. Every entry point takes the
//! previous [`StateRecord`] (when one exists) and the newly declared raw spec,
//! and returns the new record or an error; persistence of records across
//! invocations belongs to the host engine. On any failure the caller keeps
//! its previous record, so the last-known-good state is never lost to a
//! partial overwrite.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exec::{self, CancelToken, ExecutionResult};
use crate::spec::{self, CommandDefinition, RawResourceSpec, ResourceSpec, Verb};
use crate::value;

/// Snapshot persisted between invocations.
///
/// Exists exactly when `create` has succeeded at least once and `delete` has
/// not subsequently completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Normalized definitions of the last-applied spec
    pub spec: ResourceSpec,
    /// Fingerprint of the last-applied compare value
    pub fingerprint: String,
    /// Standard output captured from the most recent create/update
    pub stdout: String,
    /// Standard error captured from the most recent create/update
    pub stderr: String,
}

/// Drives one resource instance's lifecycle.
///
/// Holds only the cancellation token; a host that wants interrupt handling
/// builds the controller with a token it keeps a clone of.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    cancel: CancelToken,
}

impl Controller {
    /// Controller with a private, never-tripped cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller whose executions abort when `cancel` trips.
    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// Bring the resource into existence.
    ///
    /// Runs the normalized `create` definition and, on success, returns the
    /// record to persist. On failure the resource remains absent.
    pub fn create(&self, raw: RawResourceSpec) -> Result<StateRecord> {
        let spec = spec::normalize(raw)?;
        let fingerprint = value::fingerprint(spec.compare.as_ref())?;
        let result = self.run_checked(Verb::Create, &spec.create)?;
        log::info!("create succeeded");
        Ok(StateRecord {
            spec,
            fingerprint,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }

    /// Decide whether an update is required.
    ///
    /// Precedence, first match wins:
    /// 1. the normalized `update` definition changed;
    /// 2. the compare fingerprint changed;
    /// 3. a `diff` definition is declared: run it, non-zero exit means update
    ///    required, zero means unchanged;
    /// 4. otherwise unchanged.
    ///
    /// The first two are cheap synchronous signals checked before the
    /// possibly-expensive external diff command is ever spawned. A diff
    /// command that fails to start is a fatal [`Error::ProcessStart`], not an
    /// implicit "needs update": silently proceeding would mask configuration
    /// errors.
    pub fn should_update(&self, prior: &StateRecord, raw: RawResourceSpec) -> Result<bool> {
        let desired = spec::normalize(raw)?;
        let fingerprint = value::fingerprint(desired.compare.as_ref())?;

        if desired.update != prior.spec.update {
            log::debug!("update definition changed, update required");
            return Ok(true);
        }
        if fingerprint != prior.fingerprint {
            log::debug!("compare fingerprint changed, update required");
            return Ok(true);
        }
        if let Some(diff) = &desired.diff {
            let result = exec::execute(Verb::Diff, diff, &self.cancel)?;
            log::debug!("diff command exited with code {}", result.exit_code);
            return Ok(!result.success());
        }

        log::debug!("no change signal, resource unchanged");
        Ok(false)
    }

    /// Re-converge the resource.
    ///
    /// Runs the normalized `update` definition (which is `create`'s when the
    /// author never declared one) and returns the refreshed record. On error
    /// the caller must keep its prior record.
    pub fn update(&self, raw: RawResourceSpec) -> Result<StateRecord> {
        let spec = spec::normalize(raw)?;
        let fingerprint = value::fingerprint(spec.compare.as_ref())?;
        let result = self.run_checked(Verb::Update, &spec.update)?;
        log::info!("update succeeded");
        Ok(StateRecord {
            spec,
            fingerprint,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }

    /// Tear the resource down using the recorded `delete` definition.
    ///
    /// Absence of a `delete` definition is a no-op success with no process
    /// spawned. Failures are surfaced without retry; retrying arbitrary shell
    /// commands risks non-idempotent side effects, so retry policy stays with
    /// the operator.
    pub fn delete(&self, prior: &StateRecord) -> Result<Option<ExecutionResult>> {
        let Some(delete) = &prior.spec.delete else {
            log::debug!("no delete definition, delete is a no-op");
            return Ok(None);
        };
        let result = self.run_checked(Verb::Delete, delete)?;
        log::info!("delete succeeded");
        Ok(Some(result))
    }

    /// Refresh observed output via the recorded `read` definition.
    ///
    /// Returns `None` when the resource declares no `read` command; the
    /// comparison baseline (definitions, fingerprint) is never touched here.
    pub fn read(&self, prior: &StateRecord) -> Result<Option<ExecutionResult>> {
        match &prior.spec.read {
            Some(read) => self.run_checked(Verb::Read, read).map(Some),
            None => Ok(None),
        }
    }

    /// Execute a definition, treating a non-zero exit as failure.
    fn run_checked(&self, verb: Verb, def: &CommandDefinition) -> Result<ExecutionResult> {
        let result = exec::execute(verb, def, &self.cancel)?;
        if !result.success() {
            return Err(Error::CommandFailed {
                verb,
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::spec::CommandInput;
    use crate::value::Value;
    use std::path::Path;

    fn args(list: &[&str]) -> CommandInput {
        CommandInput::Args(list.iter().map(ToString::to_string).collect())
    }

    fn raw(create: &[&str]) -> RawResourceSpec {
        RawResourceSpec {
            create: Some(args(create)),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_populates_record() {
        let controller = Controller::new();
        let record = controller.create(raw(&["echo", "made"])).unwrap();
        assert_eq!(record.stdout, "made\n");
        assert_eq!(record.stderr, "");
        assert_eq!(record.spec.update, record.spec.create);
        assert_eq!(record.fingerprint, value::fingerprint(None).unwrap());
    }

    #[test]
    fn test_create_failure_reports_stderr() {
        let controller = Controller::new();
        let err = controller
            .create(raw(&["bash", "-c", "echo broken >&2; exit 7"]))
            .unwrap_err();
        match err {
            Error::CommandFailed { verb, code, stderr } => {
                assert_eq!(verb, Verb::Create);
                assert_eq!(code, 7);
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identical_spec_with_passing_diff_is_unchanged() {
        let controller = Controller::new();
        let mut declared = raw(&["ls", "-lh"]);
        declared.diff = Some(args(&["true"]));

        let record = controller.create(declared.clone()).unwrap();
        assert!(!controller.should_update(&record, declared).unwrap());
    }

    #[test]
    fn test_failing_diff_requires_update_and_update_converges() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let marker_str = marker.to_str().unwrap();

        let controller = Controller::new();
        let mut declared = raw(&["touch", marker_str]);
        // Diff probes the marker: exit 0 while it exists, non-zero once gone.
        declared.diff = Some(args(&["test", "-f", marker_str]));

        let record = controller.create(declared.clone()).unwrap();
        assert!(marker.exists());
        assert!(!controller.should_update(&record, declared.clone()).unwrap());

        std::fs::remove_file(&marker).unwrap();
        assert!(controller.should_update(&record, declared.clone()).unwrap());

        // Update defaults to the create definition and re-converges.
        let refreshed = controller.update(declared).unwrap();
        assert!(marker.exists());
        assert_eq!(refreshed.spec, record.spec);
    }

    #[test]
    fn test_compare_change_requires_update_without_diff() {
        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.compare = Some(Value::from(1));

        let record = controller.create(declared.clone()).unwrap();
        assert!(!controller.should_update(&record, declared.clone()).unwrap());

        declared.compare = Some(Value::from(2));
        assert!(controller.should_update(&record, declared).unwrap());
    }

    #[test]
    fn test_no_signal_and_no_diff_is_unchanged() {
        let controller = Controller::new();
        let declared = raw(&["true"]);
        let record = controller.create(declared.clone()).unwrap();
        assert!(!controller.should_update(&record, declared).unwrap());
    }

    #[test]
    fn test_diff_definition_change_alone_never_forces_update() {
        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.diff = Some(args(&["false"]));
        let record = controller.create(declared.clone()).unwrap();

        // Same update and compare, different diff command that exits 0.
        declared.diff = Some(args(&["true"]));
        assert!(!controller.should_update(&record, declared).unwrap());
    }

    #[test]
    fn test_changed_update_short_circuits_diff_execution() {
        let dir = tempfile::tempdir().unwrap();
        let witness = dir.path().join("diff-ran");
        let witness_str = witness.to_str().unwrap();

        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.diff = Some(args(&["touch", witness_str]));
        let record = controller.create(declared.clone()).unwrap();

        declared.update = Some(args(&["echo", "different"]));
        assert!(controller.should_update(&record, declared).unwrap());
        // The literal-change signal decided first; diff was never spawned.
        assert!(!Path::new(witness_str).exists());
    }

    #[test]
    fn test_fingerprint_change_short_circuits_diff_execution() {
        let dir = tempfile::tempdir().unwrap();
        let witness = dir.path().join("diff-ran");
        let witness_str = witness.to_str().unwrap();

        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.diff = Some(args(&["touch", witness_str]));
        declared.compare = Some(Value::from("v1"));
        let record = controller.create(declared.clone()).unwrap();

        declared.compare = Some(Value::from("v2"));
        assert!(controller.should_update(&record, declared).unwrap());
        assert!(!Path::new(witness_str).exists());
    }

    #[test]
    fn test_diff_start_failure_is_fatal_not_update_signal() {
        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.diff = Some(args(&["definitely-not-a-real-binary-7f3a"]));
        let record = controller.create(declared.clone()).unwrap();

        let err = controller.should_update(&record, declared).unwrap_err();
        assert!(matches!(err, Error::ProcessStart { verb: Verb::Diff, .. }));
    }

    #[test]
    fn test_update_failure_surfaces_error() {
        let controller = Controller::new();
        let record = controller.create(raw(&["true"])).unwrap();

        let mut declared = raw(&["true"]);
        declared.update = Some(args(&["false"]));
        let err = controller.update(declared).unwrap_err();
        assert!(matches!(
            err,
            Error::CommandFailed { verb: Verb::Update, code: 1, .. }
        ));
        // The prior record is untouched by a failed update; the caller keeps it.
        assert_eq!(record.spec.update.command, vec!["true"]);
    }

    #[test]
    fn test_delete_without_definition_is_noop() {
        let controller = Controller::new();
        let record = controller.create(raw(&["true"])).unwrap();
        assert!(controller.delete(&record).unwrap().is_none());
    }

    #[test]
    fn test_delete_runs_recorded_definition() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let marker_str = marker.to_str().unwrap();

        let controller = Controller::new();
        let mut declared = raw(&["touch", marker_str]);
        declared.delete = Some(args(&["rm", marker_str]));

        let record = controller.create(declared).unwrap();
        assert!(marker.exists());

        let result = controller.delete(&record).unwrap();
        assert!(result.is_some());
        assert!(!marker.exists());
    }

    #[test]
    fn test_delete_failure_is_command_failed() {
        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        declared.delete = Some(args(&["bash", "-c", "echo refused >&2; exit 1"]));
        let record = controller.create(declared).unwrap();

        let err = controller.delete(&record).unwrap_err();
        match err {
            Error::CommandFailed { verb, stderr, .. } => {
                assert_eq!(verb, Verb::Delete);
                assert_eq!(stderr, "refused\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_refreshes_output_without_touching_baseline() {
        let controller = Controller::new();
        let mut declared = raw(&["echo", "applied"]);
        declared.read = Some(args(&["echo", "observed"]));
        let record = controller.create(declared).unwrap();
        assert_eq!(record.stdout, "applied\n");

        let observed = controller.read(&record).unwrap().unwrap();
        assert_eq!(observed.stdout, "observed\n");
        // The record the caller holds still carries the apply-time baseline.
        assert_eq!(record.stdout, "applied\n");
    }

    #[test]
    fn test_read_without_definition_is_unsupported() {
        let controller = Controller::new();
        let record = controller.create(raw(&["true"])).unwrap();
        assert!(controller.read(&record).unwrap().is_none());
    }

    #[test]
    fn test_cancel_token_aborts_inflight_create() {
        let cancel = CancelToken::new();
        let controller = Controller::with_cancel(cancel.clone());

        let trip = cancel.clone();
        let tripper = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            trip.cancel();
        });

        let started = std::time::Instant::now();
        let err = controller.create(raw(&["sleep", "30"])).unwrap_err();
        tripper.join().unwrap();

        assert!(matches!(err, Error::Cancelled { verb: Verb::Create }));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_environment_value_reaches_update_command() {
        let controller = Controller::new();
        let mut declared = raw(&["true"]);
        let mut update = CommandDefinition::from_args(["bash", "-c", "echo $VAR"]);
        let mut environment = std::collections::BTreeMap::new();
        environment.insert("VAR".to_string(), "Hello from the overlay".to_string());
        update.environment = Some(environment);
        declared.update = Some(update.into());

        let record = controller.update(declared).unwrap();
        assert_eq!(record.stdout, "Hello from the overlay\n");
    }
}
