//! Prelude for plugin crates.

pub use async_trait::async_trait;

pub use crate::hooks::contract::{FnHandler, HookBinding, HookHandler, HookPlugin};
pub use crate::hooks::definitions::{EventType, HookPayload, HookResult};
pub use crate::options::PluginOptions;
pub use crate::resolver::{HookModule, Namespace, StaticResolver, WebAppModule};
pub use crate::webapp::cors::CorsOptions;
pub use crate::webapp::mount::{GlobalMiddleware, WebAppMount};

pub use crate::hook_payload;
