//! Application state shared across all handlers.

use std::sync::Arc;

use hookgate_plugin::{HookPluginContext, WebAppPluginContext};

/// Shared handles to both plugin contexts.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Hook plugins consulted by the API handlers.
    pub hooks: Arc<HookPluginContext>,
    /// Web-application plugins, for introspection.
    pub webapps: Arc<WebAppPluginContext>,
}

impl AppState {
    /// Creates the state from initialized contexts.
    pub fn new(hooks: Arc<HookPluginContext>, webapps: Arc<WebAppPluginContext>) -> Self {
        Self { hooks, webapps }
    }
}
