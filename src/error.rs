//! Error types for building and running wkhtmltoimage invocations

use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a cancellation context finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    /// `Context::cancel` was called on the context or one of its parents
    Cancelled,
    /// The context deadline passed
    DeadlineExceeded,
}

impl std::fmt::Display for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cancellation::Cancelled => write!(f, "context canceled"),
            Cancellation::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Errors that can occur while preparing or running wkhtmltoimage
#[derive(Error, Debug)]
pub enum Error {
    /// Every discovery strategy was exhausted
    #[error("{0} not found")]
    BinaryNotFound(String),

    /// The executable was only reachable through a relative search path entry
    #[error("{0} resolves to an executable in the current directory, refusing to run it")]
    UnsafeBinaryReference(String),

    /// The same flag was serialized twice
    #[error("duplicate argument: {0}")]
    DuplicateArgument(String),

    /// The process could not be spawned
    #[error("failed to launch {path}: {source}")]
    ProcessLaunchFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status
    #[error("{}", exit_message(.status, .diagnostics.as_deref()))]
    ProcessExitFailure {
        status: ExitStatus,
        /// Captured stderr text, only present when stderr was not redirected
        diagnostics: Option<String>,
        /// Failure copying the process output into its sink, if any
        #[source]
        output_error: Option<std::io::Error>,
    },

    /// The invocation was aborted through its context
    #[error("{0}")]
    Cancelled(Cancellation),

    /// I/O failure outside the process itself (output files, stdio pumps)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Saved generator configuration could not be read or written
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn exit_message(status: &ExitStatus, diagnostics: Option<&str>) -> String {
    match diagnostics {
        Some(text) => format!("{}\n{}", text, status),
        None => status.to_string(),
    }
}

impl Error {
    /// Returns true when the error came from a fired cancellation context
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
