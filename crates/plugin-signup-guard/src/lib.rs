//! Signup guard plugin for Hookgate.
//!
//! Contributes one hook plugin and one web-application plugin, both named
//! `signup-guard` and sharing one set of counters:
//!
//! - the hook plugin rejects `user_signup` events whose email domain is in
//!   the `blocked_domains` option and counts logins and compute sessions
//! - the web application serves those counters at `GET <prefix>/stats`

pub mod config;
pub mod hooks;
pub mod plugin;
pub mod stats;
pub mod webapp;

use std::sync::Arc;

use hookgate_plugin::prelude::*;
use hookgate_plugin::{PROTOCOL_VERSION, PluginKind};

pub use config::GuardOptions;
pub use plugin::SignupGuardPlugin;
pub use stats::{GuardStats, StatsSnapshot};

/// Module name under both namespaces, and key of the option table.
pub const MODULE_NAME: &str = "signup-guard";

/// Advertises both modules of this plugin for `host`.
///
/// Returns the counters shared by the two modules so the caller can
/// inspect them.
pub fn register(resolver: &mut StaticResolver, host: &str) -> Arc<GuardStats> {
    let stats = Arc::new(GuardStats::new());

    let hook_stats = Arc::clone(&stats);
    let hook = HookModule::from_fn(MODULE_NAME, move |options: PluginOptions| {
        let stats = Arc::clone(&hook_stats);
        async move {
            let plugin: Arc<dyn HookPlugin> =
                Arc::new(SignupGuardPlugin::from_options(&options, stats)?);
            Ok::<_, anyhow::Error>(plugin)
        }
    });

    let app_stats = Arc::clone(&stats);
    let app = WebAppModule::new(
        MODULE_NAME,
        Arc::new(move |options: PluginOptions, cors: CorsOptions| {
            let stats = Arc::clone(&app_stats);
            async move { webapp::build_mount(&options, &cors, stats) }
        }),
    );

    resolver
        .advertise(&Namespace::new(host, PluginKind::Hook, PROTOCOL_VERSION), hook)
        .advertise(&Namespace::new(host, PluginKind::WebApp, PROTOCOL_VERSION), app);

    stats
}
