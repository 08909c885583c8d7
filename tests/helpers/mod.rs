//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use hookgate::{API_PREFIX, AppState, build_router};
use hookgate_core::config::PluginConfig;
use hookgate_plugin::{
    DEFAULT_HOST, HookPluginContext, StaticResolver, WebAppPluginContext, load_hook_plugins,
    load_webapp_plugins,
};
use plugin_signup_guard::GuardStats;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Hook plugin context
    pub hooks: Arc<HookPluginContext>,
    /// Webapp plugin context
    pub webapps: Arc<WebAppPluginContext>,
    /// Counters shared by the signup guard modules
    pub stats: Arc<GuardStats>,
}

impl TestApp {
    /// Create a test application with the signup guard blocking `spam.test`
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test application from an explicit plugin configuration
    pub async fn with_config(config: PluginConfig) -> Self {
        let mut resolver = StaticResolver::new();
        let stats = plugin_signup_guard::register(&mut resolver, DEFAULT_HOST);
        Self::from_resolver(&resolver, &config, stats).await
    }

    /// Create a test application from a prepared resolver
    pub async fn from_resolver(
        resolver: &StaticResolver,
        config: &PluginConfig,
        stats: Arc<GuardStats>,
    ) -> Self {
        let hooks = Arc::new(
            load_hook_plugins(resolver, config)
                .await
                .expect("Failed to load hook plugins"),
        );
        hooks.init().await.expect("Failed to init hook plugins");

        let webapps = Arc::new(
            load_webapp_plugins(resolver, config)
                .await
                .expect("Failed to load webapp plugins")
                .with_reserved_prefixes([API_PREFIX]),
        );
        webapps.init().await.expect("Failed to init webapp plugins");

        let router = build_router(AppState::new(Arc::clone(&hooks), Arc::clone(&webapps)))
            .expect("Failed to build router");

        Self {
            router,
            hooks,
            webapps,
            stats,
        }
    }

    /// Send a JSON request through the router
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Plugin configuration used by most tests
pub fn test_config() -> PluginConfig {
    let mut config = PluginConfig::default();
    config.options.insert(
        "signup-guard".to_string(),
        json!({
            "blocked_domains": ["spam.test"],
            "report_interval_seconds": 0,
        }),
    );
    config
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}
