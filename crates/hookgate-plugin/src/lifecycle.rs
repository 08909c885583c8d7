//! Lifecycle state machine shared by the plugin contexts.
//!
//! `Uninitialized → Initializing → Ready → ShuttingDown → Stopped`

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::FutureExt;
use serde::Serialize;

use crate::error::{LifecycleError, PluginError};

/// Lifecycle state of a plugin context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecycleState {
    /// Accepting registrations.
    Uninitialized = 0,
    /// `init()` is activating plugins.
    Initializing = 1,
    /// Dispatch / enumeration allowed.
    Ready = 2,
    /// `shutdown()` is tearing plugins down.
    ShuttingDown = 3,
    /// Terminal.
    Stopped = 4,
}

impl LifecycleState {
    /// Returns the string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic holder of a context's lifecycle state.
///
/// Reads take no lock, so ready-state checks on the dispatch path never
/// contend with each other.
#[derive(Debug)]
pub(crate) struct StateCell {
    /// Context name used in error messages.
    context: &'static str,
    /// Current state, as `LifecycleState as u8`.
    state: AtomicU8,
}

impl StateCell {
    /// Creates a cell in `Uninitialized`.
    pub(crate) fn new(context: &'static str) -> Self {
        Self {
            context,
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
        }
    }

    /// Returns the current state.
    pub(crate) fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Unconditionally moves to `to`.
    pub(crate) fn set(&self, to: LifecycleState) {
        self.state.store(to as u8, Ordering::Release);
    }

    /// Atomically moves from `from` to `to`, or reports why it cannot.
    pub(crate) fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
        operation: &'static str,
    ) -> Result<(), LifecycleError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| self.error(from, LifecycleState::from_u8(current), operation))
    }

    /// Fails unless the current state is `expected`.
    pub(crate) fn require(
        &self,
        expected: LifecycleState,
        operation: &'static str,
    ) -> Result<(), LifecycleError> {
        let current = self.get();
        if current == expected {
            Ok(())
        } else {
            Err(self.error(expected, current, operation))
        }
    }

    fn error(
        &self,
        expected: LifecycleState,
        current: LifecycleState,
        operation: &'static str,
    ) -> LifecycleError {
        use LifecycleState::*;

        match (expected, current) {
            (Uninitialized, Initializing | Ready) => LifecycleError::AlreadyInitialized {
                context: self.context,
            },
            (Ready, Uninitialized | Initializing) => LifecycleError::NotInitialized {
                context: self.context,
            },
            _ => LifecycleError::InvalidState {
                context: self.context,
                operation,
                state: current,
            },
        }
    }
}

/// Awaits a plugin-authored activation step.
///
/// An error or a panic becomes [`PluginError::Activation`] for `plugin`.
pub(crate) async fn guard_activation<T, F>(plugin: &str, step: F) -> Result<T, PluginError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(PluginError::activation(plugin, &err)),
        Err(_) => Err(PluginError::activation(
            plugin,
            &anyhow::anyhow!("panicked during activation"),
        )),
    }
}
