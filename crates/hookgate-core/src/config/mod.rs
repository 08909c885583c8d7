//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so an empty file loads.

pub mod app;
pub mod logging;
pub mod plugin;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::logging::LoggingConfig;
pub use self::plugin::{CorsPolicyConfig, PluginConfig};

use crate::result::AppResult;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plugin system settings.
    #[serde(default)]
    pub plugins: PluginConfig,
}

impl AppConfig {
    /// Load configuration from the `config/` directory.
    ///
    /// Merges `config/default.toml` with the `config/<env>.toml` overlay
    /// and environment variables prefixed with `HOOKGATE_`.
    pub fn load(env: &str) -> AppResult<Self> {
        Self::load_from(Path::new("config"), env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &Path, env: &str) -> AppResult<Self> {
        let default_path = dir.join("default");
        let env_path = dir.join(env);

        let config = config::Config::builder()
            .add_source(config::File::with_name(&default_path.to_string_lossy()).required(false))
            .add_source(config::File::with_name(&env_path.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix("HOOKGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path(), "test").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.plugins.host, "hookgate");
        assert_eq!(config.plugins.api_version, "v1");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overlay_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[server]
port = 9000

[plugins]
disabled = ["noisy"]
handler_timeout_seconds = 5

[plugins.options.signup-guard]
blocked_domains = ["spam.test"]
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            r#"
[server]
port = 9100
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path(), "staging").unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.plugins.disabled, vec!["noisy".to_string()]);
        assert_eq!(config.plugins.handler_timeout_seconds, 5);
        assert_eq!(
            config.plugins.options_for("signup-guard")["blocked_domains"][0],
            serde_json::json!("spam.test")
        );
    }
}
