//! # Lifecycle
//!
//! A lifecycle engine for command-backed resources: units of infrastructure
//! whose create/read/update/delete behavior is defined entirely by
//! user-supplied commands.
//!
//! Given a resource's previously recorded state and its newly declared spec,
//! the engine decides between no-op and update, runs the corresponding
//! external command with the declared environment, stdin, and timeout, and
//! hands back the record to persist for the next invocation.
//!
//! ## Core Concepts
//!
//! - **`CommandDefinition`**: one verb's executable unit (argument vector,
//!   optional stdin/environment/timeout)
//! - **`ResourceSpec`**: the canonical declared state; `update` defaults to
//!   `create`, and absent `diff`/`read`/`delete` are meaningful
//! - **`StateRecord`**: the snapshot persisted between invocations
//! - **`Controller`**: the stateless entry points a host engine calls per verb
//!
//! ## Example
//!
//! ```no_run
//! use lifecycle::{CommandInput, Controller, RawResourceSpec};
//!
//! let declared = RawResourceSpec {
//!     create: Some(CommandInput::Args(vec!["touch".into(), "/tmp/made".into()])),
//!     diff: Some(CommandInput::Args(vec!["test".into(), "-f".into(), "/tmp/made".into()])),
//!     ..Default::default()
//! };
//!
//! let controller = Controller::new();
//! let record = controller.create(declared.clone())?;
//!
//! // Later, with the persisted record and a freshly declared spec:
//! if controller.should_update(&record, declared.clone())? {
//!     let record = controller.update(declared)?;
//!     println!("{}", record.stdout);
//! }
//! # Ok::<(), lifecycle::Error>(())
//! ```
//!
//! The host engine owns persistence and ordering; the controller holds no
//! state between calls, so each resource instance is an independently owned
//! unit and no locking is needed across instances.

pub mod controller;
pub mod error;
pub mod exec;
pub mod spec;
pub mod value;

// Re-export main types at crate root
pub use controller::{Controller, StateRecord};
pub use error::{Error, Result};
pub use exec::{CancelToken, ExecutionResult, execute};
pub use spec::{CommandDefinition, CommandInput, RawResourceSpec, ResourceSpec, Verb, normalize};
pub use value::{ABSENT_SENTINEL, Value, canonical_bytes, fingerprint};
