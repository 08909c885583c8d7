//! Cross-origin policies shared with web-application plugins.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use hookgate_core::config::{CorsPolicyConfig, PluginConfig};

/// Resource pattern → cross-origin policy.
///
/// Patterns are `*` (everything), an exact path, or `prefix/*`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorsOptions {
    /// Policies keyed by resource pattern.
    policies: BTreeMap<String, CorsPolicyConfig>,
}

impl CorsOptions {
    /// Creates options from explicit policies.
    pub fn new(policies: BTreeMap<String, CorsPolicyConfig>) -> Self {
        Self { policies }
    }

    /// Creates options from the plugin configuration.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(config.cors.clone())
    }

    /// Returns every configured pattern.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Returns the most specific policy covering `path`.
    ///
    /// An exact match wins, then the longest matching `prefix/*`, then `*`.
    pub fn policy_for(&self, path: &str) -> Option<&CorsPolicyConfig> {
        if let Some(policy) = self.policies.get(path) {
            return Some(policy);
        }

        self.policies
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, path))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, policy)| policy)
    }

    /// Builds a CORS layer for `path`, if any policy covers it.
    pub fn layer_for(&self, path: &str) -> Option<CorsLayer> {
        self.policy_for(path).map(build_cors_layer)
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix) || path == prefix.trim_end_matches('/'),
        None => pattern == path,
    }
}

/// Builds a CORS tower layer from a policy.
///
/// With credentials enabled, wildcard origins and headers are mirrored from
/// the request, since browsers refuse `*` alongside credentials.
pub fn build_cors_layer(policy: &CorsPolicyConfig) -> CorsLayer {
    let wildcard = |values: &[String]| values.iter().any(|v| v == "*");
    let mut layer = CorsLayer::new();

    // Origins
    if wildcard(&policy.allowed_origins) {
        layer = if policy.allow_credentials {
            layer.allow_origin(AllowOrigin::mirror_request())
        } else {
            layer.allow_origin(Any)
        };
    } else {
        let origins: Vec<HeaderValue> = policy
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    // Methods
    let methods: Vec<Method> = policy
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);

    // Headers
    if wildcard(&policy.allowed_headers) {
        layer = if policy.allow_credentials {
            layer.allow_headers(AllowHeaders::mirror_request())
        } else {
            layer.allow_headers(Any)
        };
    } else {
        let headers: Vec<HeaderName> = policy
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    if !policy.expose_headers.is_empty() {
        let exposed: Vec<HeaderName> = policy
            .expose_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.expose_headers(exposed);
    }

    layer
        .allow_credentials(policy.allow_credentials)
        .max_age(Duration::from_secs(policy.max_age_seconds))
}
