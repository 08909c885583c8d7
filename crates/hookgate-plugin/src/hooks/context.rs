//! Hook plugin context: registration, one-shot activation, dispatch, and
//! teardown of hook plugins.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, warn};

use hookgate_core::config::PluginConfig;

use super::contract::HookPlugin;
use super::definitions::{EventType, HookPayload, HookResult};
use super::dispatcher::HookDispatcher;
use super::registry::HandlerIndex;
use crate::error::{LifecycleError, PluginError, ShutdownFault, ShutdownReport};
use crate::lifecycle::{LifecycleState, StateCell, guard_activation};
use crate::options::PluginOptions;
use crate::resolver::HookModule;

const CONTEXT_NAME: &str = "hook plugin context";

/// A plugin whose `init` completed.
#[derive(Debug)]
struct ActivePlugin {
    /// Module name.
    name: String,
    /// The plugin instance.
    plugin: Arc<dyn HookPlugin>,
}

/// Owns every hook plugin of the host and dispatches events to them.
#[derive(Debug)]
pub struct HookPluginContext {
    /// Lifecycle state.
    state: StateCell,
    /// Plugin configuration, source of per-module options.
    config: PluginConfig,
    /// Per-invocation handler timeout.
    handler_timeout: Option<Duration>,
    /// Modules registered before `init`, in registration order.
    pending: Mutex<Vec<HookModule>>,
    /// Activated plugins, in registration order. Set once by `init`.
    plugins: OnceLock<Vec<ActivePlugin>>,
    /// Dispatcher over the frozen handler index. Set once by `init`.
    dispatcher: OnceLock<HookDispatcher>,
}

impl HookPluginContext {
    /// Creates an empty context from the plugin configuration.
    pub fn new(config: &PluginConfig) -> Self {
        let handler_timeout = match config.handler_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            state: StateCell::new(CONTEXT_NAME),
            config: config.clone(),
            handler_timeout,
            pending: Mutex::new(Vec::new()),
            plugins: OnceLock::new(),
            dispatcher: OnceLock::new(),
        }
    }

    /// Overrides the per-invocation handler timeout (`None` disables it).
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Appends a module. Only legal before `init`.
    pub async fn register(&self, module: HookModule) -> Result<(), PluginError> {
        let mut pending = self.pending.lock().await;
        // Checked under the lock so a concurrent `init` cannot miss the module.
        self.state
            .require(LifecycleState::Uninitialized, "register a plugin with")?;

        info!(plugin = %module.name(), "Hook plugin registered");
        pending.push(module);
        Ok(())
    }

    /// Activates every registered module in registration order.
    ///
    /// For each module: create the plugin, collect its bindings into the
    /// handler index, then call its `init`. The first failure aborts the
    /// whole initialization; plugins already initialized are shut down and
    /// the context ends up `Stopped`.
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

        let mut index = HandlerIndex::new();
        let mut activated: Vec<ActivePlugin> = Vec::with_capacity(modules.len());

        for module in &modules {
            match self.activate(module, &mut index).await {
                Ok(plugin) => activated.push(plugin),
                Err(err) => {
                    warn!(
                        plugin = %module.name(),
                        error = %err,
                        rollback = activated.len(),
                        "Hook plugin activation failed, rolling back"
                    );
                    let report = shutdown_all(&activated).await;
                    if !report.is_empty() {
                        warn!(report = %report, "Rollback shutdown reported faults");
                    }
                    self.state.set(LifecycleState::Stopped);
                    return Err(err);
                }
            }
        }

        let plugin_count = activated.len();
        let binding_count = index.len();

        // Both cells are empty: the state transition above admits one `init`.
        let _ = self.plugins.set(activated);
        let _ = self
            .dispatcher
            .set(HookDispatcher::new(index, self.handler_timeout));

        self.state.set(LifecycleState::Ready);

        info!(
            plugins = plugin_count,
            bindings = binding_count,
            "Hook plugin context ready"
        );

        Ok(())
    }

    /// Creates, indexes and initializes one plugin.
    async fn activate(
        &self,
        module: &HookModule,
        index: &mut HandlerIndex,
    ) -> Result<ActivePlugin, PluginError> {
        let name = module.name();
        let options = PluginOptions::new(self.config.options_for(name));

        let plugin = guard_activation(name, module.factory().create(&options)).await?;

        let bindings = guard_activation(name, async { Ok(plugin.bindings()) }).await?;
        let binding_count = bindings.len();
        for binding in bindings {
            index.insert(binding);
        }

        guard_activation(name, plugin.init()).await?;

        info!(plugin = %name, bindings = binding_count, "Hook plugin activated");

        Ok(ActivePlugin {
            name: name.to_string(),
            plugin,
        })
    }

    /// Delivers an event to every bound handler and returns the aggregate.
    ///
    /// Handler faults are folded into [`HookResult::Rejected`]; the only
    /// error this returns is a lifecycle error when the context is not ready.
    pub async fn dispatch(
        &self,
        event: EventType,
        payload: &HookPayload,
    ) -> Result<HookResult, PluginError> {
        self.state.require(LifecycleState::Ready, "dispatch")?;
        let dispatcher = self
            .dispatcher
            .get()
            .ok_or(LifecycleError::NotInitialized {
                context: CONTEXT_NAME,
            })?;

        Ok(dispatcher.dispatch(event, payload).await)
    }

    /// Dispatches and turns a rejection into [`PluginError::Rejected`].
    ///
    /// The error names the event only, never the rejecting plugin.
    pub async fn ensure_allowed(
        &self,
        event: EventType,
        payload: &HookPayload,
    ) -> Result<(), PluginError> {
        match self.dispatch(event, payload).await? {
            HookResult::Rejected => Err(PluginError::Rejected { event }),
            HookResult::Bypass | HookResult::Modified => Ok(()),
        }
    }

    /// Shuts every activated plugin down concurrently.
    ///
    /// The context reaches `Stopped` whatever the individual outcomes; any
    /// faults are returned together as [`PluginError::Shutdown`].
    pub async fn shutdown(&self) -> Result<(), PluginError> {
        self.state.transition(
            LifecycleState::Ready,
            LifecycleState::ShuttingDown,
            "shut down",
        )?;

        let plugins = self.plugins.get().map(Vec::as_slice).unwrap_or_default();
        let report = shutdown_all(plugins).await;

        self.state.set(LifecycleState::Stopped);

        if report.is_empty() {
            info!(plugins = plugins.len(), "Hook plugin context stopped");
            Ok(())
        } else {
            warn!(faults = report.faults.len(), "Hook plugin context stopped with faults");
            Err(report.into())
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Returns the names of the activated plugins, in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .get()
            .map(|plugins| plugins.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the number of handlers bound to an event type.
    pub fn handler_count(&self, event: EventType) -> usize {
        self.dispatcher
            .get()
            .map(|d| d.index().handler_count(event))
            .unwrap_or(0)
    }
}

/// Shuts plugins down concurrently and collects every fault.
async fn shutdown_all(plugins: &[ActivePlugin]) -> ShutdownReport {
    let outcomes = join_all(plugins.iter().map(|active| async move {
        let outcome = AssertUnwindSafe(active.plugin.shutdown())
            .catch_unwind()
            .await;
        let message = match outcome {
            Ok(Ok(())) => return None,
            Ok(Err(err)) => format!("{err:#}"),
            Err(_) => "panicked during shutdown".to_string(),
        };
        Some(ShutdownFault {
            plugin: active.name.clone(),
            message,
        })
    }))
    .await;

    ShutdownReport {
        faults: outcomes.into_iter().flatten().collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::hooks::contract::{FnHandler, HookBinding};

    /// Test plugin with a fixed result for `UserSignup` and configurable failures.
    #[derive(Debug, Default)]
    struct StubPlugin {
        id: String,
        result: Option<HookResult>,
        fail_handler: bool,
        fail_init: bool,
        panic_init: bool,
        fail_shutdown: bool,
        inits: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl StubPlugin {
        fn returning(id: &str, result: HookResult) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                result: Some(result),
                ..Self::default()
            })
        }

        fn failing_handler(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail_handler: true,
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl HookPlugin for StubPlugin {
        fn bindings(&self) -> Vec<HookBinding> {
            let result = self.result;
            let fail = self.fail_handler;
            if result.is_none() && !fail {
                return Vec::new();
            }
            vec![HookBinding::new(
                EventType::UserSignup,
                FnHandler::new(&self.id, move |_, _| async move {
                    if fail {
                        anyhow::bail!("handler failure");
                    }
                    Ok(result.unwrap_or(HookResult::Bypass))
                })
                .shared(),
            )]
        }

        async fn init(&self) -> anyhow::Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("init failure");
            }
            if self.panic_init {
                panic!("init bug");
            }
            Ok(())
        }

        async fn shutdown(&self) -> anyhow::Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown {
                anyhow::bail!("shutdown failure");
            }
            Ok(())
        }
    }

    fn module(name: &str, plugin: Arc<StubPlugin>) -> HookModule {
        HookModule::from_fn(name, move |_| {
            let plugin = plugin.clone();
            async move { Ok::<_, anyhow::Error>(plugin as Arc<dyn HookPlugin>) }
        })
    }

    fn context() -> HookPluginContext {
        HookPluginContext::new(&PluginConfig::default())
    }

    #[tokio::test]
    async fn test_bypass_reject_fault_aggregates_to_rejected() {
        let ctx = context();
        ctx.register(module("a", StubPlugin::returning("a", HookResult::Bypass)))
            .await
            .unwrap();
        ctx.register(module("b", StubPlugin::returning("b", HookResult::Rejected)))
            .await
            .unwrap();
        ctx.register(module("c", StubPlugin::failing_handler("c")))
            .await
            .unwrap();

        ctx.init().await.unwrap();
        assert_eq!(ctx.handler_count(EventType::UserSignup), 3);

        let result = ctx
            .dispatch(EventType::UserSignup, &HookPayload::new())
            .await
            .unwrap();
        assert_eq!(result, HookResult::Rejected);
    }

    #[tokio::test]
    async fn test_all_bypass_is_bypass() {
        let ctx = context();
        for name in ["a", "b"] {
            ctx.register(module(name, StubPlugin::returning(name, HookResult::Bypass)))
                .await
                .unwrap();
        }
        ctx.init().await.unwrap();

        let result = ctx
            .dispatch(EventType::UserSignup, &HookPayload::new())
            .await
            .unwrap();
        assert_eq!(result, HookResult::Bypass);
        assert!(ctx
            .ensure_allowed(EventType::UserSignup, &HookPayload::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_empty_context_is_trivially_ready() {
        let ctx = context();
        ctx.init().await.unwrap();
        assert_eq!(ctx.state(), LifecycleState::Ready);

        for event in EventType::ALL {
            let result = ctx.dispatch(event, &HookPayload::new()).await.unwrap();
            assert_eq!(result, HookResult::Bypass);
        }
        ctx.shutdown().await.unwrap();
        assert_eq!(ctx.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_dispatch_before_init_fails() {
        let ctx = context();
        let err = ctx
            .dispatch(EventType::UserLogin, &HookPayload::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PluginError::Lifecycle(LifecycleError::NotInitialized { .. })
        ));
    }

    #[tokio::test]
    async fn test_double_init_fails_and_stays_ready() {
        let ctx = context();
        ctx.register(module("a", StubPlugin::returning("a", HookResult::Bypass)))
            .await
            .unwrap();
        ctx.init().await.unwrap();

        let err = ctx.init().await.unwrap_err();
        assert!(matches!(
            err,
            PluginError::Lifecycle(LifecycleError::AlreadyInitialized { .. })
        ));
        assert_eq!(ctx.state(), LifecycleState::Ready);
        assert!(ctx
            .dispatch(EventType::UserSignup, &HookPayload::new())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_register_after_init_fails() {
        let ctx = context();
        ctx.init().await.unwrap();
        let err = ctx
            .register(module("late", StubPlugin::returning("late", HookResult::Bypass)))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Lifecycle(_)));
        assert!(ctx.plugin_names().is_empty());
    }

    #[tokio::test]
    async fn test_failed_init_rolls_back_initialized_plugins() {
        let first = StubPlugin::returning("first", HookResult::Bypass);
        let broken = Arc::new(StubPlugin {
            id: "broken".to_string(),
            fail_init: true,
            ..StubPlugin::default()
        });
        let never = StubPlugin::returning("never", HookResult::Bypass);

        let ctx = context();
        ctx.register(module("first", first.clone())).await.unwrap();
        ctx.register(module("broken", broken.clone())).await.unwrap();
        ctx.register(module("never", never.clone())).await.unwrap();

        let err = ctx.init().await.unwrap_err();
        assert!(matches!(err, PluginError::Activation { ref plugin, .. } if plugin == "broken"));
        assert_eq!(ctx.state(), LifecycleState::Stopped);

        assert_eq!(first.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(broken.shutdowns.load(Ordering::SeqCst), 0);
        assert_eq!(never.inits.load(Ordering::SeqCst), 0);

        assert!(ctx
            .dispatch(EventType::UserSignup, &HookPayload::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_panicking_init_rolls_back_and_stops() {
        let first = StubPlugin::returning("first", HookResult::Bypass);
        let crashy = Arc::new(StubPlugin {
            id: "crashy".to_string(),
            panic_init: true,
            ..StubPlugin::default()
        });

        let ctx = context();
        ctx.register(module("first", first.clone())).await.unwrap();
        ctx.register(module("crashy", crashy.clone())).await.unwrap();

        let err = ctx.init().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "plugin 'crashy' failed to activate: panicked during activation"
        );
        assert_eq!(ctx.state(), LifecycleState::Stopped);
        assert_eq!(first.shutdowns.load(Ordering::SeqCst), 1);

        assert!(matches!(
            ctx.init().await.unwrap_err(),
            PluginError::Lifecycle(LifecycleError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_panicking_factory_aborts_init() {
        let ctx = context();
        ctx.register(HookModule::from_fn("exploding", |_| async {
            if true {
                panic!("factory bug");
            }
            Ok::<Arc<dyn HookPlugin>, anyhow::Error>(StubPlugin::returning(
                "exploding",
                HookResult::Bypass,
            ))
        }))
        .await
        .unwrap();

        let err = ctx.init().await.unwrap_err();
        assert!(matches!(err, PluginError::Activation { ref plugin, .. } if plugin == "exploding"));
        assert_eq!(ctx.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_factory_failure_aborts_init() {
        let ctx = context();
        ctx.register(HookModule::from_fn("bad-factory", |_| async {
            Err::<Arc<dyn HookPlugin>, _>(anyhow::anyhow!("missing credentials"))
        }))
        .await
        .unwrap();

        let err = ctx.init().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "plugin 'bad-factory' failed to activate: missing credentials"
        );
    }

    #[tokio::test]
    async fn test_shutdown_fault_is_isolated_and_reported() {
        let healthy = StubPlugin::returning("healthy", HookResult::Bypass);
        let faulty = Arc::new(StubPlugin {
            id: "faulty".to_string(),
            fail_shutdown: true,
            ..StubPlugin::default()
        });

        let ctx = context();
        ctx.register(module("faulty", faulty.clone())).await.unwrap();
        ctx.register(module("healthy", healthy.clone())).await.unwrap();
        ctx.init().await.unwrap();

        let err = ctx.shutdown().await.unwrap_err();
        let PluginError::Shutdown(report) = err else {
            panic!("expected a shutdown report");
        };
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].plugin, "faulty");
        assert_eq!(report.faults[0].message, "shutdown failure");

        assert_eq!(faulty.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.state(), LifecycleState::Stopped);

        assert!(ctx.shutdown().await.is_err());
        assert_eq!(healthy.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_options_reach_the_factory() {
        let mut config = PluginConfig::default();
        config
            .options
            .insert("opts".to_string(), serde_json::json!({ "limit": 4 }));

        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_in_factory = seen.clone();
        let ctx = HookPluginContext::new(&config);
        ctx.register(HookModule::from_fn("opts", move |options: PluginOptions| {
            let seen = seen_in_factory.clone();
            async move {
                *seen.lock().unwrap() = options.get("limit").and_then(|v| v.as_u64());
                let plugin: Arc<dyn HookPlugin> =
                    StubPlugin::returning("opts", HookResult::Bypass);
                Ok::<_, anyhow::Error>(plugin)
            }
        }))
        .await
        .unwrap();
        ctx.init().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(4));
        assert_eq!(ctx.plugin_names(), vec!["opts".to_string()]);
    }
}
