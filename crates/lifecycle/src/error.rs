//! Error types for lifecycle operations.
//!
//! Errors are split along the boundaries that matter to a host engine:
//! validation and serialization errors happen before any process is spawned
//! and have no side effects, while process-level errors carry the verb and
//! whatever stderr was captured so operators can diagnose failures without
//! re-running commands by hand.

use std::io;
use thiserror::Error;

use crate::spec::Verb;

/// Errors that can occur while driving a command resource's lifecycle.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource spec did not declare a `create` definition
    #[error("missing required field: create")]
    MissingCreate,

    /// A declared verb definition is malformed (e.g., empty command vector)
    #[error("invalid {verb} definition: {message}")]
    Validation {
        /// Verb whose definition failed validation
        verb: Verb,
        /// Description of what is wrong with the definition
        message: String,
    },

    /// The compare value could not be canonically serialized
    #[error("could not serialize compare value: {message}")]
    Serialization {
        /// Description of the unsupported content
        message: String,
    },

    /// The executable could not be started (not found, not permitted)
    #[error("failed to start {verb} command `{program}`: {source}")]
    ProcessStart {
        /// Verb that was being executed
        verb: Verb,
        /// The executable that failed to start
        program: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The command exited non-zero on a verb where non-zero means failure
    #[error("{verb} command exited with code {code}: {stderr}")]
    CommandFailed {
        /// Verb that was being executed
        verb: Verb,
        /// Exit code reported by the process
        code: i32,
        /// Captured standard error output
        stderr: String,
    },

    /// The command exceeded its deadline and was terminated
    #[error("{verb} command timed out after {timeout_secs}s")]
    Timeout {
        /// Verb that was being executed
        verb: Verb,
        /// The deadline that was exceeded, in seconds
        timeout_secs: u64,
    },

    /// The in-flight command was terminated by caller-initiated cancellation
    #[error("{verb} command cancelled")]
    Cancelled {
        /// Verb that was being executed
        verb: Verb,
    },

    /// IO failure while communicating with the child process
    #[error("IO error during {verb} command: {source}")]
    Io {
        /// Verb that was being executed
        verb: Verb,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Captured stderr text, for errors that carry it.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Whether this error was detected before any process was spawned.
    ///
    /// Such errors are guaranteed to have no side effects.
    pub fn is_pre_spawn(&self) -> bool {
        matches!(
            self,
            Self::MissingCreate | Self::Validation { .. } | Self::Serialization { .. }
        )
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
