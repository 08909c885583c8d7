//! Plugin module discovery.
//!
//! Plugins advertise modules under a versioned namespace, one per plugin
//! kind: `<host>_hook_<version>` and `<host>_webapp_<version>`. Bumping the
//! version is the compatibility mechanism; a module advertised under an old
//! namespace is simply not discovered by a newer host.
//!
//! Discovery resolves module handles only. Nothing is activated until the
//! owning context's `init()`.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use hookgate_core::config::PluginConfig;

use crate::error::DiscoveryError;
use crate::hooks::contract::{HookPlugin, HookPluginFactory};
use crate::options::PluginOptions;
use crate::webapp::mount::WebAppPluginFactory;

/// Kind of contribution a plugin makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Mountable sub-application.
    WebApp,
    /// Event hook handlers.
    Hook,
}

impl PluginKind {
    /// Returns the namespace segment of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebApp => "webapp",
            Self::Hook => "hook",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A versioned capability namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Host application name.
    pub host: String,
    /// Plugin kind.
    pub kind: PluginKind,
    /// Protocol version.
    pub version: String,
}

impl Namespace {
    /// Creates a namespace.
    pub fn new(host: &str, kind: PluginKind, version: &str) -> Self {
        Self {
            host: host.to_string(),
            kind,
            version: version.to_string(),
        }
    }

    /// Hook namespace for the configured host and protocol version.
    pub fn hook(config: &PluginConfig) -> Self {
        Self::new(&config.host, PluginKind::Hook, &config.api_version)
    }

    /// Web-application namespace for the configured host and protocol version.
    pub fn webapp(config: &PluginConfig) -> Self {
        Self::new(&config.host, PluginKind::WebApp, &config.api_version)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.host, self.kind, self.version)
    }
}

impl FromStr for Namespace {
    type Err = DiscoveryError;

    /// Parses from the right, so host names may themselves contain `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DiscoveryError::InvalidNamespace(s.to_string());

        let mut parts = s.rsplitn(3, '_');
        let version = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let kind = match parts.next() {
            Some("hook") => PluginKind::Hook,
            Some("webapp") => PluginKind::WebApp,
            _ => return Err(invalid()),
        };
        let host = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;

        Ok(Self::new(host, kind, version))
    }
}

/// A discovered hook module: a name plus the factory that activates it.
#[derive(Clone)]
pub struct HookModule {
    /// Module name, unique within its namespace.
    name: String,
    /// Plugin factory.
    factory: Arc<dyn HookPluginFactory>,
}

impl HookModule {
    /// Creates a module from a factory.
    pub fn new(name: &str, factory: Arc<dyn HookPluginFactory>) -> Self {
        Self {
            name: name.to_string(),
            factory,
        }
    }

    /// Creates a module from an async factory closure.
    pub fn from_fn<F, Fut>(name: &str, factory: F) -> Self
    where
        F: Fn(PluginOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<dyn HookPlugin>>> + Send + 'static,
    {
        Self::new(name, Arc::new(factory))
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin factory.
    pub fn factory(&self) -> &Arc<dyn HookPluginFactory> {
        &self.factory
    }
}

impl fmt::Debug for HookModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A discovered web-application module.
#[derive(Clone)]
pub struct WebAppModule {
    /// Module name, unique within its namespace.
    name: String,
    /// Application factory.
    factory: Arc<dyn WebAppPluginFactory>,
}

impl WebAppModule {
    /// Creates a module from a factory.
    pub fn new(name: &str, factory: Arc<dyn WebAppPluginFactory>) -> Self {
        Self {
            name: name.to_string(),
            factory,
        }
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the application factory.
    pub fn factory(&self) -> &Arc<dyn WebAppPluginFactory> {
        &self.factory
    }
}

impl fmt::Debug for WebAppModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebAppModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An opaque, loaded-but-inactive plugin module.
#[derive(Debug, Clone)]
pub enum PluginModule {
    /// Contributes hook handlers.
    Hook(HookModule),
    /// Contributes a mountable sub-application.
    WebApp(WebAppModule),
}

impl PluginModule {
    /// Returns the module name.
    pub fn name(&self) -> &str {
        match self {
            Self::Hook(module) => module.name(),
            Self::WebApp(module) => module.name(),
        }
    }

    /// Returns the kind of contribution.
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::Hook(_) => PluginKind::Hook,
            Self::WebApp(_) => PluginKind::WebApp,
        }
    }
}

impl From<HookModule> for PluginModule {
    fn from(module: HookModule) -> Self {
        Self::Hook(module)
    }
}

impl From<WebAppModule> for PluginModule {
    fn from(module: WebAppModule) -> Self {
        Self::WebApp(module)
    }
}

/// Source of installed plugin modules.
pub trait PluginResolver: Send + Sync {
    /// Returns the modules advertised under `namespace`, in a stable order.
    fn discover(&self, namespace: &Namespace) -> Result<Vec<PluginModule>, DiscoveryError>;
}

/// Compile-time registry of plugin modules.
///
/// Plugin crates advertise their modules into it from the host's
/// composition root; advertisement order is discovery order.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    /// (namespace string, module) in advertisement order.
    entries: Vec<(String, PluginModule)>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises a module under a namespace.
    pub fn advertise(
        &mut self,
        namespace: &Namespace,
        module: impl Into<PluginModule>,
    ) -> &mut Self {
        self.advertise_raw(&namespace.to_string(), module)
    }

    /// Advertises a module under a raw namespace string.
    pub fn advertise_raw(&mut self, namespace: &str, module: impl Into<PluginModule>) -> &mut Self {
        self.entries.push((namespace.to_string(), module.into()));
        self
    }

    /// Returns the number of advertised entries across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing has been advertised.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PluginResolver for StaticResolver {
    fn discover(&self, namespace: &Namespace) -> Result<Vec<PluginModule>, DiscoveryError> {
        let key = namespace.to_string();
        let mut seen = HashSet::new();
        let mut modules = Vec::new();

        for (advertised, module) in &self.entries {
            if *advertised != key {
                continue;
            }
            if !seen.insert(module.name()) {
                return Err(DiscoveryError::DuplicateModule {
                    namespace: key,
                    name: module.name().to_string(),
                });
            }
            if module.kind() != namespace.kind {
                return Err(DiscoveryError::KindMismatch {
                    namespace: key,
                    name: module.name().to_string(),
                    expected: namespace.kind,
                    found: module.kind(),
                });
            }

            info!(namespace = %key, module = %module.name(), "Discovered plugin module");
            modules.push(module.clone());
        }

        Ok(modules)
    }
}
