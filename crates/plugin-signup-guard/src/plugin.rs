//! Signup guard hook plugin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing;

use hookgate_plugin::prelude::*;

use crate::config::GuardOptions;
use crate::hooks::{ActivityCounterHook, SignupCheckHook};
use crate::stats::GuardStats;

/// Running stats reporter: cancel signal and task handle.
#[derive(Debug)]
struct Reporter {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Signup guard plugin
#[derive(Debug)]
pub struct SignupGuardPlugin {
    /// Normalized options
    options: Arc<GuardOptions>,
    /// Counters shared with the stats application
    stats: Arc<GuardStats>,
    /// Periodic stats reporter, started by `init`
    reporter: Mutex<Option<Reporter>>,
}

impl SignupGuardPlugin {
    /// Create the plugin. Starts nothing.
    pub fn new(options: GuardOptions, stats: Arc<GuardStats>) -> Self {
        Self {
            options: Arc::new(options.normalized()),
            stats,
            reporter: Mutex::new(None),
        }
    }

    /// Create the plugin from its raw option table.
    pub fn from_options(options: &PluginOptions, stats: Arc<GuardStats>) -> anyhow::Result<Self> {
        let options: GuardOptions = options
            .parse()
            .context("invalid signup-guard options")?;
        Ok(Self::new(options, stats))
    }

    /// Get the normalized options
    pub fn options(&self) -> &GuardOptions {
        &self.options
    }
}

#[async_trait]
impl HookPlugin for SignupGuardPlugin {
    fn bindings(&self) -> Vec<HookBinding> {
        let signup: Arc<dyn HookHandler> = Arc::new(SignupCheckHook::new(
            Arc::clone(&self.options),
            Arc::clone(&self.stats),
        ));
        let counter: Arc<dyn HookHandler> =
            Arc::new(ActivityCounterHook::new(Arc::clone(&self.stats)));

        vec![
            HookBinding::new(EventType::UserSignup, signup),
            HookBinding::new(EventType::UserLogin, Arc::clone(&counter)),
            HookBinding::new(EventType::ComputeSessionStart, Arc::clone(&counter)),
            HookBinding::new(EventType::ComputeSessionTerminate, counter),
        ]
    }

    async fn init(&self) -> anyhow::Result<()> {
        tracing::info!(
            blocked_domains = self.options.blocked_domains.len(),
            "Signup guard initialized"
        );

        if self.options.report_interval_seconds == 0 {
            return Ok(());
        }

        let (cancel, rx) = watch::channel(false);
        let interval = Duration::from_secs(self.options.report_interval_seconds);
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(async move {
            report_stats(stats, interval, rx).await;
        });

        *self.reporter.lock().await = Some(Reporter { cancel, task });
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("Shutting down signup guard");

        if let Some(reporter) = self.reporter.lock().await.take() {
            let _ = reporter.cancel.send(true);
            reporter
                .task
                .await
                .context("stats reporter task did not finish cleanly")?;
        }

        tracing::info!("Signup guard shut down successfully");
        Ok(())
    }
}

/// Logs a stats snapshot every `interval` until cancelled.
async fn report_stats(
    stats: Arc<GuardStats>,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    tracing::info!("Stats reporter started, interval={}s", interval.as_secs());

    let mut ticker = time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = stats.snapshot();
                tracing::info!(
                    signups_checked = snapshot.signups_checked,
                    signups_rejected = snapshot.signups_rejected,
                    logins = snapshot.logins,
                    sessions_started = snapshot.sessions_started,
                    sessions_terminated = snapshot.sessions_terminated,
                    "Signup guard stats"
                );
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    tracing::info!("Stats reporter shutting down");
                    break;
                }
            }
        }
    }
}
