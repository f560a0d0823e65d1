//! # Error Types
//!
//! Error taxonomy surfaced by the Cloud Avenue client, built with `thiserror`.
//! Callers test errors by identity through [`CloudAvenueError::kind`].

use std::fmt;

/// Custom result type for Cloud Avenue operations
pub type Result<T> = std::result::Result<T, CloudAvenueError>;

/// Main error type for the Cloud Avenue client
#[derive(thiserror::Error, Debug)]
pub enum CloudAvenueError {
    /// A required input is missing
    #[error("Empty value: {message}")]
    Empty { message: String },

    /// An identifier or string does not parse
    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    /// The Cloud Avenue organization name does not follow `cavNNxxNNocbNNNNNNN`
    #[error("Organization format is invalid: {message}")]
    OrganizationFormatIsInvalid { message: String },

    /// Field-level validation failure
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Password grant refused or bearer rejected
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        status: Option<u16>,
    },

    /// Remote returned "not found" or a name could not be resolved
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Remote rejected the call because of concurrent state
    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    /// Any other non-2xx response
    #[error("Upstream error: {message} (status: {status})")]
    Upstream { message: String, status: u16 },

    /// Network failure
    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The caller cancelled the operation
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// A polling operation did not reach a terminal state in time
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },
}

/// Stable identity of an error, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Empty,
    InvalidFormat,
    OrganizationFormatIsInvalid,
    Validation,
    AuthFailure,
    NotFound,
    Conflict,
    Upstream,
    Transport,
    Timeout,
    Config,
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Empty => write!(f, "empty"),
            ErrorKind::InvalidFormat => write!(f, "invalid_format"),
            ErrorKind::OrganizationFormatIsInvalid => write!(f, "organization_format_is_invalid"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::AuthFailure => write!(f, "auth_failure"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Upstream => write!(f, "upstream"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Serialization => write!(f, "serialization"),
        }
    }
}

impl CloudAvenueError {
    /// Create an empty-input error
    pub fn empty<S: Into<String>>(message: S) -> Self {
        Self::Empty { message: message.into() }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    /// Create an organization format error
    pub fn organization_format<S: Into<String>>(message: S) -> Self {
        Self::OrganizationFormatIsInvalid { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, status: Option<u16>) -> Self {
        Self::Auth { message: message.into(), status }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound {
            message: format!("{} '{}' not found", resource_type.into(), id.into()),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict { message: message.into() }
    }

    /// Create an upstream error
    pub fn upstream<S: Into<String>>(message: S, status: u16) -> Self {
        Self::Upstream { message: message.into(), status }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(context: S, source: reqwest::Error) -> Self {
        Self::Transport { context: context.into(), source: Some(source) }
    }

    /// Create a transport error without an underlying cause
    pub fn transport_message<S: Into<String>>(context: S) -> Self {
        Self::Transport { context: context.into(), source: None }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled { operation: operation.into() }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), duration_ms }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Identity of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudAvenueError::Empty { .. } => ErrorKind::Empty,
            CloudAvenueError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            CloudAvenueError::OrganizationFormatIsInvalid { .. } => {
                ErrorKind::OrganizationFormatIsInvalid
            }
            CloudAvenueError::Validation { .. } => ErrorKind::Validation,
            CloudAvenueError::Auth { .. } => ErrorKind::AuthFailure,
            CloudAvenueError::NotFound { .. } => ErrorKind::NotFound,
            CloudAvenueError::Conflict { .. } => ErrorKind::Conflict,
            CloudAvenueError::Upstream { .. } => ErrorKind::Upstream,
            CloudAvenueError::Transport { .. } | CloudAvenueError::Cancelled { .. } => {
                ErrorKind::Transport
            }
            CloudAvenueError::Timeout { .. } => ErrorKind::Timeout,
            CloudAvenueError::Config { .. } => ErrorKind::Config,
            CloudAvenueError::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_empty(&self) -> bool {
        self.kind() == ErrorKind::Empty
    }

    pub fn is_invalid_format(&self) -> bool {
        self.kind() == ErrorKind::InvalidFormat
    }

    /// Prefix the error message with the operation that produced it.
    /// The kind is left untouched.
    pub(crate) fn add_context(&mut self, context: &str) {
        match self {
            CloudAvenueError::Empty { message }
            | CloudAvenueError::InvalidFormat { message }
            | CloudAvenueError::OrganizationFormatIsInvalid { message }
            | CloudAvenueError::Validation { message, .. }
            | CloudAvenueError::Auth { message, .. }
            | CloudAvenueError::NotFound { message }
            | CloudAvenueError::Conflict { message }
            | CloudAvenueError::Upstream { message, .. }
            | CloudAvenueError::Config { message, .. } => {
                *message = format!("{}: {}", context, message);
            }
            CloudAvenueError::Transport { context: ctx, .. }
            | CloudAvenueError::Serialization { context: ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            CloudAvenueError::Cancelled { operation }
            | CloudAvenueError::Timeout { operation, .. } => {
                *operation = format!("{}: {}", context, operation);
            }
        }
    }

    /// Get the HTTP status code that best describes this error
    pub fn status_code(&self) -> u16 {
        match self {
            CloudAvenueError::Empty { .. } => 400,
            CloudAvenueError::InvalidFormat { .. } => 400,
            CloudAvenueError::OrganizationFormatIsInvalid { .. } => 400,
            CloudAvenueError::Validation { .. } => 400,
            CloudAvenueError::Auth { status, .. } => status.unwrap_or(401),
            CloudAvenueError::NotFound { .. } => 404,
            CloudAvenueError::Conflict { .. } => 409,
            CloudAvenueError::Upstream { status, .. } => *status,
            CloudAvenueError::Transport { .. } => 502,
            CloudAvenueError::Cancelled { .. } => 499,
            CloudAvenueError::Timeout { .. } => 408,
            CloudAvenueError::Config { .. } => 500,
            CloudAvenueError::Serialization { .. } => 502,
        }
    }
}

/// Attach operation context to a fallible result
pub trait ErrorContext<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|mut error| {
            error.add_context(context);
            error
        })
    }
}

// Error conversions for common external error types
impl From<serde_json::Error> for CloudAvenueError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for CloudAvenueError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for CloudAvenueError {
    fn from(errors: validator::ValidationErrors) -> Self {
        crate::validation::validation_errors_to_error(&errors)
    }
}

impl From<reqwest::Error> for CloudAvenueError {
    fn from(error: reqwest::Error) -> Self {
        Self::transport("HTTP round trip failed", error)
    }
}
