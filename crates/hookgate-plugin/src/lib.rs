//! # hookgate-plugin
//!
//! Plugin runtime for Hookgate. Provides:
//!
//! - Module discovery under versioned namespaces (`<host>_hook_<version>`,
//!   `<host>_webapp_<version>`) through a static resolver
//! - The hook contract plugins implement, and the hook context that
//!   activates them and fans events out to every bound handler
//! - The web-application context that validates and mounts plugin routers
//!
//! Contexts are plain values owned by the host's composition root; there is
//! no process-wide registry.

pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod loader;
pub mod macros;
pub mod options;
pub mod prelude;
pub mod resolver;
pub mod webapp;

pub use error::{DiscoveryError, HandlerFault, LifecycleError, PluginError, ShutdownReport};
pub use hooks::context::HookPluginContext;
pub use hooks::definitions::{EventType, HookPayload, HookResult};
pub use lifecycle::LifecycleState;
pub use loader::{load_hook_plugins, load_webapp_plugins};
pub use options::PluginOptions;
pub use resolver::{
    HookModule, Namespace, PluginKind, PluginModule, PluginResolver, StaticResolver, WebAppModule,
};
pub use webapp::context::WebAppPluginContext;
pub use webapp::cors::CorsOptions;
pub use webapp::mount::{GlobalMiddleware, WebAppMount};

/// Host name used in discovery namespaces unless configured otherwise.
pub const DEFAULT_HOST: &str = "hookgate";

/// Plugin protocol version this runtime speaks.
pub const PROTOCOL_VERSION: &str = "v1";
