//! Hook system: the plugin contract, event definitions, handler index,
//! dispatcher, and the context that owns them.

pub mod context;
pub mod contract;
pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use context::HookPluginContext;
pub use contract::{FnHandler, HookBinding, HookHandler, HookPlugin, HookPluginFactory};
pub use definitions::{EventType, HookPayload, HookResult};
pub use dispatcher::HookDispatcher;
pub use registry::HandlerIndex;
