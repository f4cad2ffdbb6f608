//! Error types for operator discovery and binding calls.
//!
//! Parse gaps are not errors: the help parsers skip lines they cannot read.
//! Errors here come from running the tool, from calling a binding with the
//! wrong arguments, and from loading configuration.

use thiserror::Error;

/// Failure to run the external tool.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The argument vector was empty.
    #[error("empty command line")]
    EmptyCommand,

    /// The process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status. Displays the captured stderr.
    #[error("{stderr}")]
    NonZeroExit { status: Option<i32>, stderr: String },

    /// The process did not finish within the configured timeout.
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Waiting on the process or reading its pipes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvocationError {
    /// Captured stderr for a non-zero exit.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Failure to call a synthesized binding.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("{operator}: missing required argument '{name}'")]
    MissingArgument { operator: String, name: String },

    #[error("{operator}: unexpected argument '{name}'")]
    UnknownArgument { operator: String, name: String },

    #[error("{operator}: unsupported execution override '{name}'")]
    UnknownOverride { operator: String, name: String },

    #[error("{operator}: invalid value for '{name}': {reason}")]
    InvalidArgument {
        operator: String,
        name: String,
        reason: String,
    },

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Failure to load or save configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level error for the [`Cdo`](crate::discover::Cdo) facade.
#[derive(Debug, Error)]
pub enum CdoError {
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}

/// Convenience alias for results with [`CdoError`].
pub type Result<T> = std::result::Result<T, CdoError>;
