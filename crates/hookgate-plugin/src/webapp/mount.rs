//! The mount contract a web-application plugin returns.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use super::cors::CorsOptions;
use crate::options::PluginOptions;

/// Transform applied to the host's whole router.
type MiddlewareFn = dyn Fn(Router) -> Router + Send + Sync;

/// A named middleware a plugin wants installed host-wide.
#[derive(Clone)]
pub struct GlobalMiddleware {
    /// Name used in logs.
    name: String,
    /// Router transform, typically `router.layer(...)`.
    apply: Arc<MiddlewareFn>,
}

impl GlobalMiddleware {
    /// Creates a middleware from a router transform.
    pub fn new<F>(name: &str, apply: F) -> Self
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            apply: Arc::new(apply),
        }
    }

    /// Returns the middleware name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the middleware to a router.
    pub fn apply(&self, router: Router) -> Router {
        (self.apply)(router)
    }
}

impl fmt::Debug for GlobalMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Routing prefix, sub-application, and optional global middlewares.
#[derive(Debug, Clone)]
pub struct WebAppMount {
    /// Path the sub-application is nested under, e.g. `/quota`.
    pub prefix: String,
    /// The sub-application.
    pub app: Router,
    /// Middlewares applied to the host's whole router, or `None`.
    pub middlewares: Option<Vec<GlobalMiddleware>>,
}

impl WebAppMount {
    /// Creates a mount without global middlewares.
    pub fn new(prefix: &str, app: Router) -> Self {
        Self {
            prefix: prefix.to_string(),
            app,
            middlewares: None,
        }
    }

    /// Adds a global middleware.
    pub fn with_middleware(mut self, middleware: GlobalMiddleware) -> Self {
        self.middlewares.get_or_insert_with(Vec::new).push(middleware);
        self
    }

    /// Returns the global middlewares (empty when none were supplied).
    pub fn middlewares(&self) -> &[GlobalMiddleware] {
        self.middlewares.as_deref().unwrap_or_default()
    }
}

/// Produces a web-application mount from options and the shared CORS policies.
#[async_trait]
pub trait WebAppPluginFactory: Send + Sync {
    /// Builds the mount.
    async fn create(
        &self,
        options: &PluginOptions,
        cors: &CorsOptions,
    ) -> anyhow::Result<WebAppMount>;
}

#[async_trait]
impl<F, Fut> WebAppPluginFactory for F
where
    F: Fn(PluginOptions, CorsOptions) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<WebAppMount>> + Send + 'static,
{
    async fn create(
        &self,
        options: &PluginOptions,
        cors: &CorsOptions,
    ) -> anyhow::Result<WebAppMount> {
        (self)(options.clone(), cors.clone()).await
    }
}

/// Checks that a routing prefix can be nested into the host router.
///
/// Returns the reason on failure.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Err("expected a non-empty routing prefix".to_string());
    }
    if !prefix.starts_with('/') {
        return Err(format!("routing prefix '{prefix}' must start with '/'"));
    }
    if prefix == "/" {
        return Err("routing prefix '/' would shadow the host router".to_string());
    }
    if prefix.ends_with('/') {
        return Err(format!("routing prefix '{prefix}' must not end with '/'"));
    }
    if prefix.contains(['{', '}', '*']) {
        return Err(format!(
            "routing prefix '{prefix}' must not contain path captures or wildcards"
        ));
    }
    if prefix.contains("//") {
        return Err(format!("routing prefix '{prefix}' has an empty segment"));
    }
    Ok(())
}

/// Returns whether two prefixes would route overlapping paths once nested:
/// they are equal, or one is a whole-segment prefix of the other.
pub fn prefixes_overlap(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('/'))
    };
    a == b || nested(a, b) || nested(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_prefixes() {
        assert!(validate_prefix("/quota").is_ok());
        assert!(validate_prefix("/admin/reports").is_ok());
    }

    #[test]
    fn test_invalid_prefixes() {
        for prefix in ["", "quota", "/", "/quota/", "/{id}", "/files/*rest", "/a//b"] {
            assert!(validate_prefix(prefix).is_err(), "{prefix:?} should be rejected");
        }
        assert_eq!(
            validate_prefix("").unwrap_err(),
            "expected a non-empty routing prefix"
        );
    }

    #[test]
    fn test_middlewares_accessor() {
        let mount = WebAppMount::new("/x", Router::new());
        assert!(mount.middlewares().is_empty());
        assert!(mount.middlewares.is_none());

        let mount = mount.with_middleware(GlobalMiddleware::new("noop", |router| router));
        assert_eq!(mount.middlewares().len(), 1);
        assert_eq!(mount.middlewares()[0].name(), "noop");
    }

    #[test]
    fn test_prefix_overlap() {
        assert!(prefixes_overlap("/a", "/a"));
        assert!(prefixes_overlap("/a", "/a/b"));
        assert!(prefixes_overlap("/api/v1", "/api"));
        assert!(!prefixes_overlap("/a", "/ab"));
        assert!(!prefixes_overlap("/quota", "/reports"));
    }
}
