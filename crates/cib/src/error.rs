//! Error types for CIB operations.
//!
//! Errors are categorized so the reconciler knows which failures are worth
//! a re-fetch and retry and which are terminal. Each variant keeps the
//! diagnostic text of the external tool so it can be surfaced verbatim.

use std::io;
use thiserror::Error;

/// Exit code cibadmin uses when the requested object does not exist.
pub const EXIT_NO_SUCH_OBJECT: i32 = 105;

/// Exit codes for configuration that failed schema validation.
const EXIT_SCHEMA: [i32; 2] = [78, 203];

/// Exit codes for updates that raced with another CIB writer.
const EXIT_CONFLICT: [i32; 4] = [103, 205, 206, 207];

/// Categories of CIB errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad user input, rejected before any tool call
    Validation,
    /// Reading the current CIB failed
    Query,
    /// Pacemaker rejected the fragment as schema-invalid
    SchemaRejected,
    /// The CIB changed between read and write
    Conflict,
    /// The external tool is missing or not executable
    ToolUnavailable,
    /// A referenced or requested object does not exist
    NotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether a re-fetch followed by one more attempt can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid descriptor",
            Self::Query => "CIB query failed",
            Self::SchemaRejected => "Rejected by CIB schema",
            Self::Conflict => "Concurrent CIB modification",
            Self::ToolUnavailable => "Cluster tool unavailable",
            Self::NotFound => "Object not found",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the named field and run again",
            Self::Query => "Check that the cluster is running and the CIB is readable",
            Self::SchemaRejected => "Check attribute names and values against the Pacemaker schema",
            Self::Conflict => "Another tool is editing the CIB; run again once it settles",
            Self::ToolUnavailable => "Install pacemaker-cli or point the config at the right binary",
            Self::NotFound => "Create the referenced resource or node first",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while reconciling the CIB.
#[derive(Debug, Error)]
pub enum Error {
    /// A descriptor field is missing or malformed
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// The query tool failed or returned something unusable
    #[error("CIB query failed: {message}")]
    Query {
        /// Diagnostic text
        message: String,
    },

    /// XML could not be parsed
    #[error("malformed XML: {0}")]
    Xml(String),

    /// A constraint or group refers to something not in the CIB
    #[error("unknown {kind} '{id}'")]
    UnknownReference {
        /// What was referenced (resource, node)
        kind: &'static str,
        /// The missing id
        id: String,
    },

    /// The admin tool refused the fragment as schema-invalid
    #[error("rejected by CIB schema: {message}")]
    SchemaRejected {
        /// Diagnostic text from the tool
        message: String,
    },

    /// The CIB epoch moved between read and write
    #[error("CIB modified concurrently: {message}")]
    ConcurrentModification {
        /// Diagnostic text from the tool
        message: String,
    },

    /// The external binary is missing or not executable
    #[error("{tool} is not available: {message}")]
    ToolUnavailable {
        /// Path or name of the tool
        tool: String,
        /// Why it could not be run
        message: String,
    },

    /// The requested object does not exist
    #[error("no such object: {id}")]
    NotFound {
        /// Id or query that matched nothing
        id: String,
    },

    /// The requested change cannot be expressed safely
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Command execution failed for another reason
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A failure while applying a specific descriptor
    #[error("{kind} '{id}' failed: {source}")]
    Descriptor {
        /// Descriptor kind (primitive, group, location, ...)
        kind: &'static str,
        /// Descriptor id
        id: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for a validation error on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attach descriptor context, unless already attached.
    pub fn for_descriptor(self, kind: &'static str, id: impl Into<String>) -> Self {
        match self {
            Self::Descriptor { .. } => self,
            other => Self::Descriptor {
                kind,
                id: id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Query { .. } | Error::Xml(_) => ErrorCategory::Query,
            Error::UnknownReference { .. } | Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::SchemaRejected { .. } => ErrorCategory::SchemaRejected,
            Error::ConcurrentModification { .. } => ErrorCategory::Conflict,
            Error::ToolUnavailable { .. } => ErrorCategory::ToolUnavailable,
            Error::Descriptor { source, .. } => source.category(),
            _ => ErrorCategory::Other,
        }
    }

    /// Whether a re-fetch followed by one more attempt can succeed.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Display text, plus captured stderr when the variant does not show it.
    pub fn detailed(&self) -> String {
        match self {
            Error::CommandFailed { stderr, .. } if !stderr.is_empty() => format!("{self}: {stderr}"),
            Error::Descriptor { kind, id, source } => {
                format!("{kind} '{id}' failed: {}", source.detailed())
            }
            _ => self.to_string(),
        }
    }

    /// Map a failure to spawn `tool` to an error.
    pub fn from_spawn(tool: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Error::ToolUnavailable {
                tool: tool.to_string(),
                message: err.to_string(),
            },
            _ => Error::Io(err),
        }
    }

    /// Create an error from a failed cibadmin or crm_mon run.
    ///
    /// The exit code is checked first, then stderr is scanned for the
    /// diagnostics Pacemaker prints when exit codes are not distinctive.
    pub fn from_tool_output(tool: &str, code: Option<i32>, stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let stderr_lower = stderr.to_lowercase();

        if matches!(code, Some(126 | 127)) {
            return Error::ToolUnavailable {
                tool: tool.to_string(),
                message,
            };
        }

        if code == Some(EXIT_NO_SUCH_OBJECT)
            || stderr_lower.contains("no such device or address")
            || stderr_lower.contains("no such object")
        {
            return Error::NotFound { id: message };
        }

        if code.is_some_and(|c| EXIT_SCHEMA.contains(&c))
            || stderr_lower.contains("does not conform to the configured schema")
            || stderr_lower.contains("update does not conform")
            || stderr_lower.contains("schema validation")
        {
            return Error::SchemaRejected { message };
        }

        if code.is_some_and(|c| EXIT_CONFLICT.contains(&c))
            || stderr_lower.contains("update was older than existing configuration")
            || stderr_lower.contains("update diff failed")
            || stderr_lower.contains("application of an update diff failed")
        {
            return Error::ConcurrentModification { message };
        }

        Error::CommandFailed {
            message: match code {
                Some(c) => format!("{tool} exited with status {c}"),
                None => format!("{tool} was terminated by a signal"),
            },
            stderr: message,
        }
    }
}

/// Result type for CIB operations.
pub type Result<T> = std::result::Result<T, Error>;
