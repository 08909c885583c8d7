//! Hookgate Server: reference host for the plugin runtime.
//!
//! Wires the plugin contexts into an HTTP service and starts it.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use hookgate::{API_PREFIX, AppState, build_router};
use hookgate_core::config::AppConfig;
use hookgate_core::error::AppError;
use hookgate_core::result::AppResult;
use hookgate_plugin::{
    HookPluginContext, PluginError, StaticResolver, WebAppPluginContext, load_hook_plugins,
    load_webapp_plugins,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> AppResult<AppConfig> {
    let env = std::env::var("HOOKGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting Hookgate v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Advertise compiled-in plugins ────────────────────
    let mut resolver = StaticResolver::new();
    plugin_signup_guard::register(&mut resolver, &config.plugins.host);
    tracing::info!(entries = resolver.len(), "Plugin registry built");

    // ── Step 2: Load and initialize hook plugins ─────────────────
    let hooks = Arc::new(load_hook_plugins(&resolver, &config.plugins).await?);
    hooks.init().await?;

    // ── Step 3: Load and initialize webapp plugins ───────────────
    let webapps = match init_webapps(&resolver, &config).await {
        Ok(webapps) => Arc::new(webapps),
        Err(e) => {
            shutdown_plugins(&hooks, None).await;
            return Err(e.into());
        }
    };

    // ── Step 4: Build router ─────────────────────────────────────
    let state = AppState::new(Arc::clone(&hooks), Arc::clone(&webapps));
    let app = match build_router(state) {
        Ok(app) => app,
        Err(e) => {
            shutdown_plugins(&hooks, Some(&webapps)).await;
            return Err(e.into());
        }
    };

    // ── Step 5: Serve until a shutdown signal ────────────────────
    let addr = config.server.bind_address();
    let served = serve(&addr, app).await;

    // ── Step 6: Tear plugins down ────────────────────────────────
    shutdown_plugins(&hooks, Some(&webapps)).await;

    served?;
    tracing::info!("Hookgate server shut down gracefully");
    Ok(())
}

async fn init_webapps(
    resolver: &StaticResolver,
    config: &AppConfig,
) -> Result<WebAppPluginContext, PluginError> {
    let webapps = load_webapp_plugins(resolver, &config.plugins)
        .await?
        .with_reserved_prefixes([API_PREFIX]);
    webapps.init().await?;
    Ok(webapps)
}

async fn serve(addr: &str, app: axum::Router) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {addr}")).caused_by(e))?;

    tracing::info!("Hookgate server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await?;
    Ok(())
}

/// Shut both contexts down, logging rather than returning any fault
async fn shutdown_plugins(hooks: &HookPluginContext, webapps: Option<&WebAppPluginContext>) {
    if let Some(webapps) = webapps {
        if let Err(e) = webapps.shutdown().await {
            tracing::warn!(error = %e, "Webapp plugin context shutdown failed");
        }
    }

    match hooks.shutdown().await {
        Ok(()) => tracing::info!("Hook plugins shut down"),
        Err(PluginError::Shutdown(report)) => {
            for fault in &report.faults {
                tracing::error!(
                    plugin = %fault.plugin,
                    error = %fault.message,
                    "Plugin shutdown fault"
                );
            }
        }
        Err(e) => tracing::warn!(error = %e, "Hook plugin context shutdown failed"),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
