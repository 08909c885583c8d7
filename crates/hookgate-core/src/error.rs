//! Host-boundary error type.
//!
//! Plugin-runtime, configuration and I/O errors all end up as an
//! [`AppError`], so the HTTP layer and the server binary handle one type.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed underlying cause of an [`AppError`].
type Cause = Box<dyn StdError + Send + Sync>;

/// Category of an [`AppError`]. The HTTP layer picks the status code from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No such resource (unknown event name, missing route target).
    NotFound,
    /// Refused by policy, including hook plugin rejections.
    Authorization,
    /// Malformed request input.
    Validation,
    /// Configuration could not be loaded.
    Configuration,
    /// A plugin failed outside of a rejection.
    Plugin,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns the upper-case code used in logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Authorization => "AUTHORIZATION",
            Self::Validation => "VALIDATION",
            Self::Configuration => "CONFIGURATION",
            Self::Plugin => "PLUGIN",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error carried across the host boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// Category.
    pub kind: ErrorKind,
    /// Message safe to show to a caller.
    pub message: String,
    /// Underlying cause, if any.
    #[source]
    pub source: Option<Cause>,
}

impl AppError {
    /// Creates an error without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn caused_by(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(cause));
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn plugin(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Plugin, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration(format!("invalid configuration: {err}")).caused_by(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {err}")).caused_by(err)
    }
}
