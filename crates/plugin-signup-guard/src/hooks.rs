//! Hook handlers of the signup guard.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing;

use hookgate_plugin::prelude::*;

use crate::MODULE_NAME;
use crate::config::GuardOptions;
use crate::stats::GuardStats;

/// Hook handler for user_signup: rejects blocked email domains.
#[derive(Debug)]
pub struct SignupCheckHook {
    /// Normalized guard options
    options: Arc<GuardOptions>,
    /// Shared counters
    stats: Arc<GuardStats>,
}

impl SignupCheckHook {
    /// Create a new user_signup hook handler
    pub fn new(options: Arc<GuardOptions>, stats: Arc<GuardStats>) -> Self {
        Self { options, stats }
    }
}

#[async_trait]
impl HookHandler for SignupCheckHook {
    async fn handle(&self, event: EventType, payload: &HookPayload) -> anyhow::Result<HookResult> {
        let email = match payload
            .get_string("email")
            .with_context(|| format!("{event} payload carries no email"))
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(event = %event, error = %e, "Signup check failed");
                return Err(e);
            }
        };

        let rejected = self.options.is_blocked(email);
        self.stats.record_signup(rejected);

        if rejected {
            let domain = email.rsplit_once('@').map_or("", |(_, domain)| domain);
            tracing::info!(domain = %domain, "Signup rejected for blocked domain");
            Ok(HookResult::Rejected)
        } else {
            Ok(HookResult::Bypass)
        }
    }

    fn plugin_id(&self) -> &str {
        MODULE_NAME
    }
}

/// Hook handler for user_login and compute session events: counts them.
#[derive(Debug)]
pub struct ActivityCounterHook {
    /// Shared counters
    stats: Arc<GuardStats>,
}

impl ActivityCounterHook {
    /// Create a new counting hook handler
    pub fn new(stats: Arc<GuardStats>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl HookHandler for ActivityCounterHook {
    async fn handle(&self, event: EventType, payload: &HookPayload) -> anyhow::Result<HookResult> {
        match event {
            EventType::UserLogin => self.stats.record_login(),
            EventType::ComputeSessionStart => self.stats.record_session_start(),
            EventType::ComputeSessionTerminate => self.stats.record_session_terminate(),
            other => {
                tracing::warn!(event = %other, "Counter hook received an unexpected event");
                return Ok(HookResult::Bypass);
            }
        }

        tracing::debug!(event = %event, actor = ?payload.actor_id, "Activity counted");
        Ok(HookResult::Bypass)
    }

    fn plugin_id(&self) -> &str {
        MODULE_NAME
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn signup_hook(domains: &[&str]) -> (SignupCheckHook, Arc<GuardStats>) {
        let options = GuardOptions {
            blocked_domains: domains.iter().map(|d| d.to_string()).collect(),
            ..GuardOptions::default()
        }
        .normalized();
        let stats = Arc::new(GuardStats::new());
        (SignupCheckHook::new(Arc::new(options), Arc::clone(&stats)), stats)
    }

    #[tokio::test]
    async fn test_signup_check() {
        let (hook, stats) = signup_hook(&["spam.test"]);

        let blocked = hook_payload!({ "email" => json!("eve@spam.test") });
        let allowed = hook_payload!({ "email" => json!("ann@example.com") });

        assert_eq!(
            hook.handle(EventType::UserSignup, &blocked).await.unwrap(),
            HookResult::Rejected
        );
        assert_eq!(
            hook.handle(EventType::UserSignup, &allowed).await.unwrap(),
            HookResult::Bypass
        );
        assert_eq!(stats.snapshot().signups_rejected, 1);
        assert_eq!(stats.snapshot().signups_checked, 2);
    }

    #[tokio::test]
    async fn test_signup_without_email_is_an_error() {
        let (hook, stats) = signup_hook(&[]);
        let err = hook
            .handle(EventType::UserSignup, &HookPayload::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "user_signup payload carries no email");
        assert_eq!(stats.snapshot().signups_checked, 0);
    }

    #[tokio::test]
    async fn test_activity_counter() {
        let stats = Arc::new(GuardStats::new());
        let hook = ActivityCounterHook::new(Arc::clone(&stats));

        for event in [
            EventType::UserLogin,
            EventType::ComputeSessionStart,
            EventType::ComputeSessionTerminate,
            EventType::VolumeCreate,
        ] {
            let result = hook.handle(event, &HookPayload::new()).await.unwrap();
            assert_eq!(result, HookResult::Bypass);
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.logins, 1);
        assert_eq!(snapshot.sessions_started, 1);
        assert_eq!(snapshot.sessions_terminated, 1);
    }
}
