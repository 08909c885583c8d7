//! Stats web application of the signup guard.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tracing;

use hookgate_plugin::prelude::*;

use crate::MODULE_NAME;
use crate::config::GuardOptions;
use crate::stats::{GuardStats, StatsSnapshot};

/// Response header listing the plugins that served the host.
pub const PLUGINS_HEADER: &str = "x-hookgate-plugins";

/// Builds the stats application mount.
///
/// The CORS policy covering `<prefix>/stats` is applied to the application;
/// a global middleware tags every host response with [`PLUGINS_HEADER`].
pub fn build_mount(
    options: &PluginOptions,
    cors: &CorsOptions,
    stats: Arc<GuardStats>,
) -> anyhow::Result<WebAppMount> {
    let options: GuardOptions = options
        .parse()
        .context("invalid signup-guard options")?;

    let mut app = Router::new()
        .route("/stats", get(get_stats))
        .with_state(stats);

    let stats_path = format!("{}/stats", options.prefix);
    if let Some(layer) = cors.layer_for(&stats_path) {
        tracing::debug!(path = %stats_path, "Applying CORS policy to signup guard stats");
        app = app.layer(layer);
    }

    Ok(WebAppMount::new(&options.prefix, app)
        .with_middleware(GlobalMiddleware::new("plugin-header", tag_responses)))
}

/// GET <prefix>/stats
async fn get_stats(State(stats): State<Arc<GuardStats>>) -> Json<StatsSnapshot> {
    Json(stats.snapshot())
}

fn tag_responses(router: Router) -> Router {
    router.layer(axum::middleware::map_response(append_plugin_header))
}

async fn append_plugin_header(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(PLUGINS_HEADER, HeaderValue::from_static(MODULE_NAME));
    response
}
