use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::analyst::{ReportAnalyst, RetryPolicy, Sessions};
use crate::history::ReportHistory;
use crate::refresh::AutoRefresh;

/// Report parameters (admins can modify at runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub max_attempts: u32,
    pub backoff_step_ms: u64,
    pub refresh_interval_secs: u64,
    /// Open every section when a report is first shown.
    pub expand_all: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_step_ms: 2000,
            refresh_interval_secs: 300,
            expand_all: false,
        }
    }
}

impl ReportConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

pub struct AppState {
    pub history: Arc<ReportHistory>,
    pub analyst: Arc<ReportAnalyst>,
    pub sessions: Arc<Sessions>,
    pub refresh: Arc<AutoRefresh>,
    pub admin_ids: HashSet<u64>,
    pub report_config: Arc<RwLock<ReportConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ReportConfig::default().retry_policy();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.delay_after(3), Duration::from_secs(6));
    }
}
