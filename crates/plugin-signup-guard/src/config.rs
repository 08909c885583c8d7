//! Options of the signup guard, read from `[plugins.options.signup-guard]`.

use serde::{Deserialize, Serialize};

/// Signup guard options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardOptions {
    /// Email domains whose signups are rejected. Compared case-insensitively.
    #[serde(default)]
    pub blocked_domains: Vec<String>,
    /// Interval between stats log records, in seconds. `0` disables them.
    #[serde(default = "default_report_interval")]
    pub report_interval_seconds: u64,
    /// Routing prefix of the stats application.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_report_interval() -> u64 {
    300
}

fn default_prefix() -> String {
    "/signup-guard".to_string()
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            blocked_domains: Vec::new(),
            report_interval_seconds: default_report_interval(),
            prefix: default_prefix(),
        }
    }
}

impl GuardOptions {
    /// Lowercases and trims the blocked domains, dropping empty entries.
    pub fn normalized(mut self) -> Self {
        self.blocked_domains = self
            .blocked_domains
            .iter()
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    /// Returns whether the domain of `email` is blocked.
    ///
    /// Subdomains of a blocked domain are blocked too.
    pub fn is_blocked(&self, email: &str) -> bool {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        let domain = domain.trim().to_ascii_lowercase();

        self.blocked_domains.iter().any(|blocked| {
            domain == *blocked
                || domain
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(domains: &[&str]) -> GuardOptions {
        GuardOptions {
            blocked_domains: domains.iter().map(|d| d.to_string()).collect(),
            ..GuardOptions::default()
        }
        .normalized()
    }

    #[test]
    fn test_blocked_domain_matching() {
        let options = options(&["Spam.test", "@junk.test", "  "]);
        assert_eq!(options.blocked_domains, vec!["spam.test", "junk.test"]);

        assert!(options.is_blocked("eve@spam.test"));
        assert!(options.is_blocked("eve@SPAM.TEST"));
        assert!(options.is_blocked("eve@mail.junk.test"));
        assert!(!options.is_blocked("eve@notspam.test"));
        assert!(!options.is_blocked("eve@example.com"));
        assert!(!options.is_blocked("not-an-email"));
    }

    #[test]
    fn test_defaults_from_empty_table() {
        let options: GuardOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(options, GuardOptions::default());
        assert_eq!(options.prefix, "/signup-guard");
    }
}
