//! Error types for the frame orchestration core
//!
//! Structural graph errors (unregistered passes, missing outputs, unwired
//! requirements) are returned as `Error`. Binding-discipline violations on the
//! framebuffer stack are programming errors and panic instead.

use std::fmt;

/// Result type for frame orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame orchestration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A pass was referenced that is not registered in the graph
    PassNotInGraph(String),

    /// A pass was asked for an output it does not produce
    PassDoesNotProduceResource {
        /// Display name of the pass
        pass: String,
        /// Requested resource label
        label: String,
    },

    /// One or more declared requirements have no incoming resource
    ResourceGraphNotValid(String),

    /// Resource links form a cycle (dependency ordering only)
    CyclicDependency(Vec<String>),

    /// Backend-specific error (texture allocation, target binding, etc.)
    BackendError(String),

    /// Invalid resource (wrong kind, wrong size, etc.)
    InvalidResource(String),

    /// Operation not allowed in the current lifecycle state
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PassNotInGraph(pass) => write!(f, "Pass not in graph: {}", pass),
            Error::PassDoesNotProduceResource { pass, label } => {
                write!(f, "Pass '{}' does not produce resource '{}'", pass, label)
            }
            Error::ResourceGraphNotValid(details) => {
                write!(f, "Resource graph not valid: {}", details)
            }
            Error::CyclicDependency(passes) => {
                write!(f, "Cyclic dependency between passes: {}", passes.join(", "))
            }
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Log an error at its source and return it from the enclosing function
///
/// # Example
///
/// ```ignore
/// engine_bail!("orchestra::Graph", Error::PassNotInGraph(name));
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $err:expr) => {{
        let err: $crate::orchestra::Error = $err;
        $crate::orchestra_error!($source, "{}", err);
        return Err(err);
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
