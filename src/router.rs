//! Route definitions of the host.
//!
//! Host routes live under `/api`; every web-application plugin is nested
//! under its own prefix, and plugin global middlewares wrap the result.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use hookgate_plugin::PluginError;

use crate::handlers;
use crate::state::AppState;

/// Prefix of the host's own routes. Plugins may not mount under it.
pub const API_PREFIX: &str = "/api";

/// Build the complete router.
///
/// Fails when the web-application context is not initialized.
pub fn build_router(state: AppState) -> Result<Router, PluginError> {
    let webapps = state.webapps.clone();

    let api_routes = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/events/{event}", post(handlers::raise_event))
        .route("/plugins", get(handlers::list_plugins))
        .route("/health", get(handlers::health));

    let host = Router::new().nest(API_PREFIX, api_routes).with_state(state);

    Ok(webapps
        .mount_into(host)?
        .layer(TraceLayer::new_for_http()))
}
