//! Web-application plugin context: activates web-application plugins,
//! validates their mount contract, and exposes the accepted mounts.

use std::sync::OnceLock;

use axum::Router;
use tokio::sync::Mutex;
use tracing::{info, warn};

use hookgate_core::config::PluginConfig;

use super::cors::CorsOptions;
use super::mount::{WebAppMount, prefixes_overlap, validate_prefix};
use crate::error::{LifecycleError, PluginError};
use crate::lifecycle::{LifecycleState, StateCell, guard_activation};
use crate::options::PluginOptions;
use crate::resolver::{PluginKind, WebAppModule};

const CONTEXT_NAME: &str = "webapp plugin context";

/// Owns every web-application plugin of the host.
#[derive(Debug)]
pub struct WebAppPluginContext {
    /// Lifecycle state.
    state: StateCell,
    /// Plugin configuration, source of per-module options.
    config: PluginConfig,
    /// Shared cross-origin policies handed to every factory.
    cors: CorsOptions,
    /// Prefixes the host routes itself; no plugin may overlap them.
    reserved: Vec<String>,
    /// Modules registered before `init`, in registration order.
    pending: Mutex<Vec<WebAppModule>>,
    /// Accepted mounts, in registration order. Set once by `init`.
    mounts: OnceLock<Vec<WebAppMount>>,
}

impl WebAppPluginContext {
    /// Creates an empty context from the plugin configuration.
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            state: StateCell::new(CONTEXT_NAME),
            config: config.clone(),
            cors: CorsOptions::from_config(config),
            reserved: Vec::new(),
            pending: Mutex::new(Vec::new()),
            mounts: OnceLock::new(),
        }
    }

    /// Reserves prefixes for the host's own routes.
    pub fn with_reserved_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Appends a module. Only legal before `init`.
    pub async fn register(&self, module: WebAppModule) -> Result<(), PluginError> {
        let mut pending = self.pending.lock().await;
        self.state
            .require(LifecycleState::Uninitialized, "register a plugin with")?;

        info!(plugin = %module.name(), "Webapp plugin registered");
        pending.push(module);
        Ok(())
    }

    /// Calls every factory in registration order and validates the mounts.
    ///
    /// A factory failure or a malformed mount aborts initialization; no
    /// mount is exposed and the context ends up `Stopped`.
    pub async fn init(&self) -> Result<(), PluginError> {
        let modules = {
            let mut pending = self.pending.lock().await;
            self.state.transition(
                LifecycleState::Uninitialized,
                LifecycleState::Initializing,
                "initialize",
            )?;
            std::mem::take(&mut *pending)
        };

        match self.build_mounts(&modules).await {
            Ok(mounts) => {
                let count = mounts.len();
                // Empty: the state transition above admits one `init`.
                let _ = self.mounts.set(mounts);
                self.state.set(LifecycleState::Ready);
                info!(webapps = count, "Webapp plugin context ready");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Webapp plugin initialization failed");
                self.state.set(LifecycleState::Stopped);
                Err(err)
            }
        }
    }

    async fn build_mounts(
        &self,
        modules: &[WebAppModule],
    ) -> Result<Vec<WebAppMount>, PluginError> {
        let mut mounts: Vec<WebAppMount> = Vec::with_capacity(modules.len());

        for module in modules {
            let name = module.name();
            let options = PluginOptions::new(self.config.options_for(name));

            let mount =
                guard_activation(name, module.factory().create(&options, &self.cors)).await?;

            validate_prefix(&mount.prefix)
                .map_err(|reason| PluginError::protocol(PluginKind::WebApp, name, reason))?;
            self.check_overlap(name, &mount.prefix, &mounts)?;

            info!(
                plugin = %name,
                prefix = %mount.prefix,
                middlewares = mount.middlewares().len(),
                "Webapp plugin accepted"
            );
            mounts.push(mount);
        }

        Ok(mounts)
    }

    /// Rejects a prefix that collides with a host prefix or an accepted mount.
    fn check_overlap(
        &self,
        name: &str,
        prefix: &str,
        accepted: &[WebAppMount],
    ) -> Result<(), PluginError> {
        let violation = |reason: String| PluginError::protocol(PluginKind::WebApp, name, reason);

        if let Some(reserved) = self.reserved.iter().find(|r| prefixes_overlap(r, prefix)) {
            return Err(violation(format!(
                "routing prefix '{prefix}' overlaps host prefix '{reserved}'"
            )));
        }

        match accepted.iter().find(|m| prefixes_overlap(&m.prefix, prefix)) {
            Some(mount) if mount.prefix == prefix => Err(violation(format!(
                "routing prefix '{prefix}' is already mounted"
            ))),
            Some(mount) => Err(violation(format!(
                "routing prefix '{prefix}' overlaps mounted prefix '{}'",
                mount.prefix
            ))),
            None => Ok(()),
        }
    }

    /// Returns the accepted mounts, in registration order.
    ///
    /// Restartable: every call yields a fresh iterator over the same mounts.
    pub fn enumerate(&self) -> Result<std::slice::Iter<'_, WebAppMount>, PluginError> {
        self.state.require(LifecycleState::Ready, "enumerate")?;
        let mounts = self.mounts.get().ok_or(LifecycleError::NotInitialized {
            context: CONTEXT_NAME,
        })?;
        Ok(mounts.iter())
    }

    /// Nests every accepted sub-application under its prefix, then applies
    /// every global middleware in registration order.
    pub fn mount_into(&self, router: Router) -> Result<Router, PluginError> {
        let mounts: Vec<&WebAppMount> = self.enumerate()?.collect();

        let router = mounts
            .iter()
            .fold(router, |router, mount| router.nest(&mount.prefix, mount.app.clone()));

        Ok(mounts
            .iter()
            .flat_map(|mount| mount.middlewares())
            .fold(router, |router, middleware| {
                info!(middleware = %middleware.name(), "Applying plugin global middleware");
                middleware.apply(router)
            }))
    }

    /// Stops the context. Web-application plugins hold no resources of
    /// their own, so this only closes the lifecycle.
    pub async fn shutdown(&self) -> Result<(), PluginError> {
        self.state.transition(
            LifecycleState::Ready,
            LifecycleState::ShuttingDown,
            "shut down",
        )?;
        self.state.set(LifecycleState::Stopped);
        info!("Webapp plugin context stopped");
        Ok(())
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Returns the shared cross-origin policies.
    pub fn cors(&self) -> &CorsOptions {
        &self.cors
    }
}
