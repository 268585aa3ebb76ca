use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ReportError;
use crate::report::{AnalysisMode, Language};

/// Request lifecycle of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading {
        query: String,
        mode: AnalysisMode,
        lang: Language,
    },
    /// The report text itself goes to the presenter and history, not here.
    Success,
    Failed {
        message: String,
    },
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading { .. })
    }

    /// Start a request. `None` while another one is still in flight.
    pub fn submit(&self, query: &str, mode: AnalysisMode, lang: Language) -> Option<RequestState> {
        if self.is_loading() {
            return None;
        }
        Some(RequestState::Loading {
            query: query.to_string(),
            mode,
            lang,
        })
    }

    /// Outcome of the request. Applies from any state: a result arriving
    /// after a reset is still recorded.
    pub fn resolve(&self, result: &Result<String, ReportError>) -> RequestState {
        match result {
            Ok(_) => RequestState::Success,
            Err(err) => RequestState::Failed {
                message: err.to_string(),
            },
        }
    }

    pub fn reset(&self) -> RequestState {
        RequestState::Idle
    }
}

/// Per-channel request states, keyed by Discord channel id.
#[derive(Default)]
pub struct Sessions {
    states: RwLock<HashMap<u64, RequestState>>,
}

impl Sessions {
    /// Move the channel to `Loading`. If a request is already in flight its
    /// state comes back as the error.
    pub async fn begin(
        &self,
        channel: u64,
        query: &str,
        mode: AnalysisMode,
        lang: Language,
    ) -> Result<(), RequestState> {
        let mut states = self.states.write().await;
        let current = states.entry(channel).or_default();
        match current.submit(query, mode, lang) {
            Some(next) => {
                *current = next;
                Ok(())
            }
            None => Err(current.clone()),
        }
    }

    pub async fn finish(&self, channel: u64, result: &Result<String, ReportError>) {
        let mut states = self.states.write().await;
        let current = states.entry(channel).or_default();
        *current = current.resolve(result);
    }

    pub async fn reset(&self, channel: u64) {
        let mut states = self.states.write().await;
        if let Some(current) = states.get_mut(&channel) {
            *current = current.reset();
        }
    }

    pub async fn get(&self, channel: u64) -> RequestState {
        self.states
            .read()
            .await
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }
}
