//! Error types for frontend-infra.
//!
//! Every failure this crate can produce happens while building or
//! synthesizing the declared stacks. Provider-side failures (name collisions,
//! quotas, permissions) are reported by CloudFormation at deploy time and
//! never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for frontend-infra operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for frontend-infra.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// A construct id is empty or contains a path separator.
    #[error("Invalid construct id '{id}': {message}")]
    InvalidConstructId {
        /// Offending id
        id: String,
        /// Error message
        message: String,
    },

    /// Two constructs in the same stack share an id.
    #[error("There is already a construct with id '{id}' in stack '{stack}'")]
    DuplicateConstruct {
        /// Stack name
        stack: String,
        /// Duplicated construct id
        id: String,
    },

    /// A stack with the same name was already added to the app.
    #[error("Stack '{0}' is already defined in this app")]
    DuplicateStack(String),

    /// Invalid stack name.
    #[error("Invalid stack name '{name}': {message}")]
    InvalidStackName {
        /// Stack name
        name: String,
        /// Error message
        message: String,
    },

    /// Bucket name rejected by the naming rules.
    #[error("Invalid bucket name '{name}': {message}")]
    InvalidBucketName {
        /// Bucket name
        name: String,
        /// Error message
        message: String,
    },

    /// Construct properties that contradict each other.
    #[error("Invalid properties for '{construct}': {message}")]
    InvalidProps {
        /// Construct path
        construct: String,
        /// Error message
        message: String,
    },

    /// Malformed context entry (expected KEY=VALUE).
    #[error("Invalid context entry '{0}': expected KEY=VALUE")]
    InvalidContext(String),

    // ========================================================================
    // Synthesis Errors
    // ========================================================================
    /// Stack not found in the app.
    #[error("Stack '{0}' not found in app")]
    StackNotFound(String),

    /// Reference to a resource the producing stack does not declare.
    #[error("Unresolved reference to '{logical_id}' in stack '{stack}'")]
    UnresolvedReference {
        /// Producing stack
        stack: String,
        /// Logical id that could not be found
        logical_id: String,
    },

    /// Cross-stack reference that cannot be expressed as an export.
    #[error("Invalid cross-stack reference from '{consumer}' to '{producer}': {message}")]
    InvalidCrossStackReference {
        /// Consuming stack
        consumer: String,
        /// Producing stack
        producer: String,
        /// Error message
        message: String,
    },

    /// Stacks depend on each other in a cycle.
    #[error("Dependency cycle between stacks: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// Template file missing when comparing against a previous assembly.
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new invalid construct id error.
    pub fn invalid_construct_id(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstructId {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid bucket name error.
    pub fn invalid_bucket_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidBucketName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid props error.
    pub fn invalid_props(construct: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProps {
            construct: construct.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid stack name error.
    pub fn invalid_stack_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStackName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid config value error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error stems from the declaration itself rather
    /// than from the environment the synthesizer runs in.
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConstructId { .. }
                | Error::DuplicateConstruct { .. }
                | Error::DuplicateStack(_)
                | Error::InvalidStackName { .. }
                | Error::InvalidBucketName { .. }
                | Error::InvalidProps { .. }
                | Error::UnresolvedReference { .. }
                | Error::InvalidCrossStackReference { .. }
                | Error::DependencyCycle(_)
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig { .. } | Error::InvalidContext(_) => 2,
            e if e.is_declaration_error() => 3,
            Error::StackNotFound(_) => 3,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::invalid_config("target.account", "bad").exit_code(), 2);
        assert_eq!(Error::InvalidContext("env".into()).exit_code(), 2);
        assert_eq!(
            Error::invalid_bucket_name("A", "uppercase").exit_code(),
            3
        );
        assert_eq!(Error::StackNotFound("x".into()).exit_code(), 3);
        assert_eq!(
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")).exit_code(),
            1
        );
    }

    #[test]
    fn test_cycle_message() {
        let err = Error::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Dependency cycle between stacks: a -> b -> a");
    }

    #[test]
    fn test_error_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.context("reading template").unwrap_err();
        assert_eq!(err.to_string(), "reading template");
        assert!(std::error::Error::source(&err).is_some());
    }
}
