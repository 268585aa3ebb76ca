pub mod error;
pub mod prompts;
pub mod retry;
pub mod state;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::llm::{Completion, Message};
use crate::report::{AnalysisMode, Language};

pub use error::ReportError;
pub use retry::RetryPolicy;
pub use state::{RequestState, Sessions};

/// Anything that can turn chat messages into one completion.
pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> BoxFuture<'a, Result<Completion, ReportError>>;
}

/// Builds the prompt for a query and drives the provider under a retry policy.
pub struct ReportAnalyst {
    provider: Arc<dyn CompletionProvider>,
}

impl ReportAnalyst {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Request a full report. Returns the raw markdown text.
    pub async fn request_report(
        &self,
        query: &str,
        mode: AnalysisMode,
        lang: Language,
        policy: RetryPolicy,
    ) -> Result<String, ReportError> {
        let messages = prompts::build_messages(query, mode, lang);
        let messages = messages.as_slice();
        let provider = self.provider.as_ref();

        info!(query, mode = ?mode, lang = ?lang, "Report requested");

        let report = policy
            .run(|attempt| async move {
                debug!(attempt, "Requesting completion");
                let completion = provider.complete(messages).await?;
                accept(completion)
            })
            .await?;

        info!(report_len = report.len(), "Report received");
        Ok(report)
    }
}

/// Empty text is transient unless the provider said why it stopped.
fn accept(completion: Completion) -> Result<String, ReportError> {
    if !completion.text.trim().is_empty() {
        return Ok(completion.text);
    }
    match completion.finish_reason {
        Some(reason) if !reason.eq_ignore_ascii_case("stop") => Err(ReportError::Blocked(reason)),
        _ => Err(ReportError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a fixed list of outcomes, one per call.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Completion, ReportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Completion, ReportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn complete<'a>(
            &'a self,
            _messages: &'a [Message],
        ) -> BoxFuture<'a, Result<Completion, ReportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ReportError::Provider("script exhausted".into())));
            Box::pin(async move { next })
        }
    }

    fn text(t: &str) -> Result<Completion, ReportError> {
        Ok(Completion {
            text: t.to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn overloaded(n: u32) -> Result<Completion, ReportError> {
        Err(ReportError::Provider(format!("HTTP 503: overloaded #{}", n)))
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            backoff_step: Duration::ZERO,
        }
    }

    async fn run(provider: Arc<ScriptedProvider>) -> Result<String, ReportError> {
        ReportAnalyst::new(provider)
            .request_report("NVDA", AnalysisMode::DeepDive, Language::En, policy())
            .await
    }

    #[tokio::test]
    async fn test_succeeds_when_failures_below_max() {
        let provider = ScriptedProvider::new(vec![
            overloaded(1),
            overloaded(2),
            overloaded(3),
            text("# Report"),
        ]);
        assert_eq!(run(provider.clone()).await, Ok("# Report".to_string()));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_fails_with_final_error_when_failures_reach_max() {
        let provider = ScriptedProvider::new(vec![
            overloaded(1),
            overloaded(2),
            overloaded(3),
            overloaded(4),
            text("never reached"),
        ]);
        assert_eq!(
            run(provider.clone()).await,
            Err(ReportError::Provider("HTTP 503: overloaded #4".into()))
        );
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(ReportError::Provider("HTTP 401: API key not valid".into())),
            text("never reached"),
        ]);
        assert!(run(provider.clone()).await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_retried() {
        let provider = ScriptedProvider::new(vec![text(""), text("  \n"), text("ok")]);
        assert_eq!(run(provider.clone()).await, Ok("ok".to_string()));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_text_with_block_reason_fails_fast() {
        let provider = ScriptedProvider::new(vec![
            Ok(Completion {
                text: String::new(),
                finish_reason: Some("SAFETY".to_string()),
            }),
            text("never reached"),
        ]);
        assert_eq!(
            run(provider.clone()).await,
            Err(ReportError::Blocked("SAFETY".into()))
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_config_error_surfaces_immediately() {
        let provider = ScriptedProvider::new(vec![Err(ReportError::Config(
            "LLM_API_KEY is not set".into(),
        ))]);
        let err = run(provider.clone()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "API key configuration error: LLM_API_KEY is not set"
        );
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_accept_missing_finish_reason() {
        let c = Completion {
            text: String::new(),
            finish_reason: None,
        };
        assert_eq!(accept(c), Err(ReportError::EmptyResponse));
    }
}
