//! Error taxonomy of the plugin runtime.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use hookgate_core::error::AppError;

use crate::hooks::definitions::EventType;
use crate::lifecycle::LifecycleState;
use crate::resolver::PluginKind;

/// Module discovery failed. Fatal at startup, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// A namespace string does not have the `<host>_<kind>_<version>` shape.
    #[error("invalid plugin namespace '{0}'")]
    InvalidNamespace(String),
    /// Two entries under one namespace share a name.
    #[error("module '{name}' is advertised more than once under '{namespace}'")]
    DuplicateModule {
        /// Namespace being enumerated.
        namespace: String,
        /// Duplicated module name.
        name: String,
    },
    /// An entry advertises the wrong plugin kind for its namespace.
    #[error("module '{name}' under '{namespace}' is a {found} plugin, expected {expected}")]
    KindMismatch {
        /// Namespace being enumerated.
        namespace: String,
        /// Offending module name.
        name: String,
        /// Kind the namespace requires.
        expected: PluginKind,
        /// Kind the module actually provides.
        found: PluginKind,
    },
    /// The configured allowlist names a module that is not installed.
    #[error("enabled module '{name}' is not installed under '{namespace}'")]
    MissingModule {
        /// Namespace being enumerated.
        namespace: String,
        /// Module named by the allowlist.
        name: String,
    },
}

/// An operation was called in a lifecycle state that forbids it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `init()` (or `register()`) called after initialization started.
    #[error("{context} is already initialized")]
    AlreadyInitialized {
        /// Context name.
        context: &'static str,
    },
    /// A ready-only operation called before `init()` completed.
    #[error("{context} is not initialized")]
    NotInitialized {
        /// Context name.
        context: &'static str,
    },
    /// Any other forbidden transition.
    #[error("cannot {operation} {context} while it is {state}")]
    InvalidState {
        /// Context name.
        context: &'static str,
        /// Attempted operation.
        operation: &'static str,
        /// State at the time of the call.
        state: LifecycleState,
    },
}

/// Fault captured from a single hook handler invocation.
///
/// Never propagated to the dispatch caller; it only turns the aggregate
/// into [`HookResult::Rejected`](crate::HookResult::Rejected).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFault {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),
    /// The handler panicked.
    #[error("handler panicked")]
    Panicked,
    /// The handler did not finish within the invocation timeout.
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),
}

/// A plugin that faulted while shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownFault {
    /// Module name of the plugin.
    pub plugin: String,
    /// Rendered fault.
    pub message: String,
}

/// Aggregate of every shutdown fault seen during one teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ShutdownReport {
    /// Faults in registration order of their plugins.
    pub faults: Vec<ShutdownFault>,
}

impl ShutdownReport {
    /// Returns whether every plugin shut down cleanly.
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plugin(s) failed to shut down", self.faults.len())?;
        for fault in &self.faults {
            write!(f, "; {}: {}", fault.plugin, fault.message)?;
        }
        Ok(())
    }
}

/// Top-level error of the plugin runtime.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Module discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// A plugin did not honor its factory contract.
    #[error("{kind} plugin protocol error in '{plugin}': {reason}")]
    ProtocolViolation {
        /// Kind of the offending plugin.
        kind: PluginKind,
        /// Module name.
        plugin: String,
        /// What was wrong with the returned contract.
        reason: String,
    },
    /// A plugin factory or `init()` failed.
    #[error("plugin '{plugin}' failed to activate: {message}")]
    Activation {
        /// Module name.
        plugin: String,
        /// Rendered cause chain.
        message: String,
    },
    /// Wrong lifecycle state for the requested operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// One or more plugins faulted during shutdown.
    #[error(transparent)]
    Shutdown(#[from] ShutdownReport),
    /// The aggregate dispatch result was a rejection.
    #[error("{event} was rejected by policy")]
    Rejected {
        /// Event that was rejected.
        event: EventType,
    },
}

impl PluginError {
    /// Builds an activation error from a plugin-authored failure.
    pub fn activation(plugin: &str, err: &anyhow::Error) -> Self {
        Self::Activation {
            plugin: plugin.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Builds a protocol violation.
    pub fn protocol(kind: PluginKind, plugin: &str, reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            kind,
            plugin: plugin.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Rejected { .. } => AppError::authorization(err.to_string()),
            PluginError::Lifecycle(_) => AppError::internal(err.to_string()),
            _ => AppError::plugin(err.to_string()),
        }
    }
}
