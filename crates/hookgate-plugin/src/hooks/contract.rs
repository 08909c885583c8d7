//! The contract every hook plugin implements.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::definitions::{EventType, HookPayload, HookResult};
use crate::options::PluginOptions;

/// A single handler bound to an event type.
#[async_trait]
pub trait HookHandler: Send + Sync + std::fmt::Debug {
    /// Handles one event occurrence.
    ///
    /// Returning an error (or panicking) counts as a rejection. Handlers
    /// should log their own failures before returning them.
    async fn handle(&self, event: EventType, payload: &HookPayload) -> anyhow::Result<HookResult>;

    /// Returns the ID of the plugin owning this handler.
    fn plugin_id(&self) -> &str;
}

/// An (event type, handler) pair declared by a plugin.
#[derive(Debug, Clone)]
pub struct HookBinding {
    /// Event the handler wants to receive.
    pub event: EventType,
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
}

impl HookBinding {
    /// Creates a binding.
    pub fn new(event: EventType, handler: Arc<dyn HookHandler>) -> Self {
        Self { event, handler }
    }
}

/// An activated hook plugin.
#[async_trait]
pub trait HookPlugin: Send + Sync + std::fmt::Debug {
    /// Declares the handlers this plugin wants to receive.
    ///
    /// Must be free of side effects; it is called before [`init`](Self::init).
    fn bindings(&self) -> Vec<HookBinding>;

    /// Called exactly once after bindings are collected.
    async fn init(&self) -> anyhow::Result<()>;

    /// Called exactly once at teardown if `init` succeeded.
    async fn shutdown(&self) -> anyhow::Result<()>;
}

/// Produces a hook plugin from its configured options.
#[async_trait]
pub trait HookPluginFactory: Send + Sync {
    /// Creates the plugin instance. Must not start any work; that is `init`'s job.
    async fn create(&self, options: &PluginOptions) -> anyhow::Result<Arc<dyn HookPlugin>>;
}

#[async_trait]
impl<F, Fut> HookPluginFactory for F
where
    F: Fn(PluginOptions) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Arc<dyn HookPlugin>>> + Send + 'static,
{
    async fn create(&self, options: &PluginOptions) -> anyhow::Result<Arc<dyn HookPlugin>> {
        (self)(options.clone()).await
    }
}

/// Boxed closure stored by [`FnHandler`].
type HandlerFn =
    dyn Fn(EventType, HookPayload) -> BoxFuture<'static, anyhow::Result<HookResult>> + Send + Sync;

/// A closure-based hook handler for quick handler creation.
#[derive(Clone)]
pub struct FnHandler {
    /// Plugin ID.
    id: String,
    /// Handler function.
    handler: Arc<HandlerFn>,
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("id", &self.id)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(plugin_id: &str, handler: F) -> Self
    where
        F: Fn(EventType, HookPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookResult>> + Send + 'static,
    {
        Self {
            id: plugin_id.to_string(),
            handler: Arc::new(
                move |event: EventType,
                      payload: HookPayload|
                      -> BoxFuture<'static, anyhow::Result<HookResult>> {
                    Box::pin(handler(event, payload))
                },
            ),
        }
    }

    /// Wraps the handler into an `Arc<dyn HookHandler>`.
    pub fn shared(self) -> Arc<dyn HookHandler> {
        Arc::new(self)
    }
}

#[async_trait]
impl HookHandler for FnHandler {
    async fn handle(&self, event: EventType, payload: &HookPayload) -> anyhow::Result<HookResult> {
        (self.handler)(event, payload.clone()).await
    }

    fn plugin_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_handler_receives_event_and_payload() {
        let handler = FnHandler::new("echo", |event, payload: HookPayload| async move {
            assert_eq!(event, EventType::VolumeCreate);
            if payload.get_bool("deny") == Some(true) {
                Ok(HookResult::Rejected)
            } else {
                Ok(HookResult::Bypass)
            }
        });

        let allowed = handler
            .handle(EventType::VolumeCreate, &HookPayload::new())
            .await
            .unwrap();
        let denied = handler
            .handle(
                EventType::VolumeCreate,
                &HookPayload::new().with_bool("deny", true),
            )
            .await
            .unwrap();

        assert_eq!(handler.plugin_id(), "echo");
        assert_eq!(allowed, HookResult::Bypass);
        assert_eq!(denied, HookResult::Rejected);
    }
}
