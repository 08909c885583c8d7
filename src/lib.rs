//! # hookgate
//!
//! Reference host for the Hookgate plugin runtime: a small HTTP service
//! whose signup endpoint consults hook plugins before acting, with a
//! generic route for raising any other event and every web-application
//! plugin mounted next to them.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::{API_PREFIX, build_router};
pub use state::AppState;
