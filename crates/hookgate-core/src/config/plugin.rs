//! Plugin system configuration.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Host name used to build discovery namespaces (`<host>_hook_<version>`).
    #[serde(default = "default_host_name")]
    pub host: String,
    /// Plugin protocol version used to build discovery namespaces.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// When set, only these modules are loaded. Naming a module that is not
    /// installed fails discovery.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,
    /// Modules that are installed but must not be loaded.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Upper bound for a single hook handler invocation, in seconds (0 = none).
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_seconds: u64,
    /// Per-plugin option tables, keyed by module name.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
    /// Cross-origin policies shared with web-application plugins, keyed by
    /// resource pattern (`*`, an exact path, or `prefix/*`).
    #[serde(default = "default_cors")]
    pub cors: BTreeMap<String, CorsPolicyConfig>,
}

impl PluginConfig {
    /// Returns the option table for a module, or an empty table.
    pub fn options_for(&self, module: &str) -> serde_json::Value {
        self.options
            .get(module)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Checks whether a module is excluded by the `enabled` / `disabled` lists.
    pub fn is_module_allowed(&self, module: &str) -> bool {
        if self.disabled.iter().any(|name| name == module) {
            return false;
        }
        match &self.enabled {
            Some(enabled) => enabled.iter().any(|name| name == module),
            None => true,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            host: default_host_name(),
            api_version: default_api_version(),
            enabled: None,
            disabled: Vec::new(),
            handler_timeout_seconds: default_handler_timeout(),
            options: HashMap::new(),
            cors: default_cors(),
        }
    }
}

/// A single cross-origin policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsPolicyConfig {
    /// Allowed origins (use `["*"]` for development only).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// Allowed HTTP headers.
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,
    /// Headers exposed to the browser.
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Whether credentials may accompany requests.
    #[serde(default)]
    pub allow_credentials: bool,
    /// Max age for preflight cache in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
}

impl Default for CorsPolicyConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_seconds: default_max_age(),
        }
    }
}

fn default_host_name() -> String {
    "hookgate".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_handler_timeout() -> u64 {
    30
}

fn default_cors() -> BTreeMap<String, CorsPolicyConfig> {
    BTreeMap::from([("*".to_string(), CorsPolicyConfig::default())])
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_methods() -> Vec<String> {
    vec![
        "GET".to_string(),
        "POST".to_string(),
        "PUT".to_string(),
        "DELETE".to_string(),
        "PATCH".to_string(),
        "OPTIONS".to_string(),
    ]
}

fn default_allowed_headers() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_age() -> u64 {
    3600
}
