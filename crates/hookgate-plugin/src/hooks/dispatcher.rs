//! Hook dispatcher: fans an event out to every bound handler and reduces
//! the outcomes to a single decision.
//!
//! - All handlers for the event run concurrently and are all awaited; a
//!   rejection or fault never cuts the others short.
//! - Each outcome is either the handler's `HookResult` or a captured
//!   [`HandlerFault`] (error, panic, or timeout).
//! - Any fault or `Rejected` makes the aggregate `Rejected`, otherwise it is
//!   `Bypass`. Faults are never re-raised to the caller.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, warn};

use super::contract::HookHandler;
use super::definitions::{EventType, HookPayload, HookResult};
use super::registry::HandlerIndex;
use crate::error::HandlerFault;

/// Outcome of one handler invocation.
pub type HandlerOutcome = Result<HookResult, HandlerFault>;

/// Reduces handler outcomes to the aggregate decision.
pub fn reduce<'a>(outcomes: impl IntoIterator<Item = &'a HandlerOutcome>) -> HookResult {
    let rejected = outcomes
        .into_iter()
        .any(|outcome| !matches!(outcome, Ok(HookResult::Bypass | HookResult::Modified)));

    if rejected {
        HookResult::Rejected
    } else {
        HookResult::Bypass
    }
}

/// Dispatches events over a frozen handler index.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Handler index.
    index: HandlerIndex,
    /// Upper bound for a single invocation.
    timeout: Option<Duration>,
}

impl HookDispatcher {
    /// Creates a dispatcher over a finished index.
    pub fn new(index: HandlerIndex, timeout: Option<Duration>) -> Self {
        Self { index, timeout }
    }

    /// Delivers one event occurrence to every bound handler.
    pub async fn dispatch(&self, event: EventType, payload: &HookPayload) -> HookResult {
        let handlers = self.index.handlers(event);

        if handlers.is_empty() {
            return HookResult::Bypass;
        }

        debug!(
            event = %event,
            handler_count = handlers.len(),
            "Dispatching hook event"
        );

        let outcomes = join_all(
            handlers
                .iter()
                .map(|handler| self.invoke(event, handler.as_ref(), payload)),
        )
        .await;

        let result = reduce(&outcomes);

        debug!(event = %event, result = %result, "Hook event dispatched");

        result
    }

    /// Runs one handler, converting errors, panics and timeouts into faults.
    async fn invoke(
        &self,
        event: EventType,
        handler: &dyn HookHandler,
        payload: &HookPayload,
    ) -> HandlerOutcome {
        let call = AssertUnwindSafe(handler.handle(event, payload)).catch_unwind();

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        event = %event,
                        plugin_id = %handler.plugin_id(),
                        timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        "Hook handler timed out"
                    );
                    return Err(HandlerFault::TimedOut(limit));
                }
            },
            None => call.await,
        };

        // Handlers log their own failures; the fault only feeds the reduction.
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(HandlerFault::Failed(format!("{err:#}"))),
            Err(_) => Err(HandlerFault::Panicked),
        }
    }

    /// Returns the handler index.
    pub fn index(&self) -> &HandlerIndex {
        &self.index
    }
}
