//! Web-application plugins: mount contract, shared CORS policies, and the
//! context that validates and mounts them.

pub mod context;
pub mod cors;
pub mod mount;

pub use context::WebAppPluginContext;
pub use cors::CorsOptions;
pub use mount::{GlobalMiddleware, WebAppMount, WebAppPluginFactory};
