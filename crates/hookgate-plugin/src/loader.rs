//! Startup loading: discover the modules of a namespace, apply the
//! configured allow/deny lists, and register them into a fresh context.
//!
//! Nothing is activated here; the caller still owns the `init()` call.

use tracing::info;

use hookgate_core::config::PluginConfig;

use crate::error::{DiscoveryError, PluginError};
use crate::hooks::context::HookPluginContext;
use crate::resolver::{Namespace, PluginKind, PluginModule, PluginResolver};
use crate::webapp::context::WebAppPluginContext;

/// Discovers hook modules and registers them into a new hook context.
pub async fn load_hook_plugins(
    resolver: &dyn PluginResolver,
    config: &PluginConfig,
) -> Result<HookPluginContext, PluginError> {
    let namespace = Namespace::hook(config);
    info!(namespace = %namespace, "Loading hook plugins");

    let context = HookPluginContext::new(config);
    for module in select(resolver, &namespace, config)? {
        match module {
            PluginModule::Hook(module) => context.register(module).await?,
            other => return Err(kind_mismatch(&namespace, &other).into()),
        }
    }
    Ok(context)
}

/// Discovers web-application modules and registers them into a new context.
pub async fn load_webapp_plugins(
    resolver: &dyn PluginResolver,
    config: &PluginConfig,
) -> Result<WebAppPluginContext, PluginError> {
    let namespace = Namespace::webapp(config);
    info!(namespace = %namespace, "Loading webapp plugins");

    let context = WebAppPluginContext::new(config);
    for module in select(resolver, &namespace, config)? {
        match module {
            PluginModule::WebApp(module) => context.register(module).await?,
            other => return Err(kind_mismatch(&namespace, &other).into()),
        }
    }
    Ok(context)
}

/// Runs discovery and filters the result through `enabled` / `disabled`.
fn select(
    resolver: &dyn PluginResolver,
    namespace: &Namespace,
    config: &PluginConfig,
) -> Result<Vec<PluginModule>, DiscoveryError> {
    let modules = resolver.discover(namespace)?;

    // The allowlist spans both kinds, so a name is only missing when
    // neither namespace of this protocol version advertises it.
    if let Some(enabled) = &config.enabled {
        let sibling = Namespace::new(
            &namespace.host,
            sibling_kind(namespace.kind),
            &namespace.version,
        );
        let others = resolver.discover(&sibling)?;
        if let Some(missing) = enabled.iter().find(|name| {
            !modules
                .iter()
                .chain(others.iter())
                .any(|m| m.name() == name.as_str())
        }) {
            return Err(DiscoveryError::MissingModule {
                namespace: namespace.to_string(),
                name: missing.clone(),
            });
        }
    }

    Ok(modules
        .into_iter()
        .filter(|module| {
            let allowed = config.is_module_allowed(module.name());
            if !allowed {
                info!(
                    namespace = %namespace,
                    module = %module.name(),
                    "Plugin module disabled by configuration"
                );
            }
            allowed
        })
        .collect())
}

fn sibling_kind(kind: PluginKind) -> PluginKind {
    match kind {
        PluginKind::Hook => PluginKind::WebApp,
        PluginKind::WebApp => PluginKind::Hook,
    }
}

fn kind_mismatch(namespace: &Namespace, module: &PluginModule) -> DiscoveryError {
    DiscoveryError::KindMismatch {
        namespace: namespace.to_string(),
        name: module.name().to_string(),
        expected: namespace.kind,
        found: module.kind(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hooks::contract::{HookBinding, HookPlugin};
    use crate::lifecycle::LifecycleState;
    use crate::options::PluginOptions;
    use crate::resolver::{HookModule, StaticResolver, WebAppModule};
    use crate::webapp::cors::CorsOptions;
    use crate::webapp::mount::WebAppMount;

    #[derive(Debug)]
    struct Inert;

    #[async_trait::async_trait]
    impl HookPlugin for Inert {
        fn bindings(&self) -> Vec<HookBinding> {
            Vec::new()
        }

        async fn init(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn shutdown(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn hook(name: &str) -> HookModule {
        HookModule::from_fn(name, |_| async {
            let plugin: Arc<dyn HookPlugin> = Arc::new(Inert);
            Ok::<_, anyhow::Error>(plugin)
        })
    }

    fn resolver() -> StaticResolver {
        let config = PluginConfig::default();
        let mut resolver = StaticResolver::new();
        resolver
            .advertise(&Namespace::hook(&config), hook("audit"))
            .advertise(&Namespace::hook(&config), hook("quota"))
            .advertise(
                &Namespace::webapp(&config),
                WebAppModule::new(
                    "console",
                    Arc::new(|_: PluginOptions, _: CorsOptions| async {
                        Ok::<_, anyhow::Error>(WebAppMount::new("/console", axum::Router::new()))
                    }),
                ),
            );
        resolver
    }

    #[tokio::test]
    async fn test_load_registers_discovered_modules() {
        let config = PluginConfig::default();
        let hooks = load_hook_plugins(&resolver(), &config).await.unwrap();
        assert_eq!(hooks.state(), LifecycleState::Uninitialized);
        hooks.init().await.unwrap();
        assert_eq!(hooks.plugin_names(), vec!["audit", "quota"]);

        let apps = load_webapp_plugins(&resolver(), &config).await.unwrap();
        apps.init().await.unwrap();
        assert_eq!(apps.enumerate().unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_module_is_skipped() {
        let config = PluginConfig {
            disabled: vec!["audit".to_string()],
            ..PluginConfig::default()
        };
        let hooks = load_hook_plugins(&resolver(), &config).await.unwrap();
        hooks.init().await.unwrap();
        assert_eq!(hooks.plugin_names(), vec!["quota"]);
    }

    #[tokio::test]
    async fn test_enabled_allowlist_restricts_modules() {
        let config = PluginConfig {
            enabled: Some(vec!["quota".to_string()]),
            ..PluginConfig::default()
        };
        let hooks = load_hook_plugins(&resolver(), &config).await.unwrap();
        hooks.init().await.unwrap();
        assert_eq!(hooks.plugin_names(), vec!["quota"]);

        let apps = load_webapp_plugins(&resolver(), &config).await.unwrap();
        apps.init().await.unwrap();
        assert_eq!(apps.enumerate().unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_allowlist_naming_missing_module_fails() {
        let config = PluginConfig {
            enabled: Some(vec!["ghost".to_string()]),
            ..PluginConfig::default()
        };
        let err = load_hook_plugins(&resolver(), &config).await.unwrap_err();
        let PluginError::Discovery(DiscoveryError::MissingModule { name, .. }) = err else {
            panic!("expected a missing module error");
        };
        assert_eq!(name, "ghost");
    }

    #[tokio::test]
    async fn test_newer_protocol_ignores_old_modules() {
        let config = PluginConfig {
            api_version: "v2".to_string(),
            ..PluginConfig::default()
        };
        let hooks = load_hook_plugins(&resolver(), &config).await.unwrap();
        hooks.init().await.unwrap();
        assert!(hooks.plugin_names().is_empty());
    }
}
