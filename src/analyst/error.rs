use super::retry::is_transient_message;

/// Failures surfaced by report generation. `Display` is the message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Missing or unusable credentials. Never retried.
    #[error("API key configuration error: {0}")]
    Config(String),
    /// HTTP, network or provider-side failure, carrying the provider's message.
    #[error("{0}")]
    Provider(String),
    #[error("Model returned an empty response.")]
    EmptyResponse,
    /// Completion ended for a reason other than `stop` and produced no text.
    #[error("Analysis blocked. Reason: {0}")]
    Blocked(String),
}

impl ReportError {
    pub fn is_transient(&self) -> bool {
        match self {
            ReportError::Config(_) | ReportError::Blocked(_) => false,
            other => is_transient_message(&other.to_string()),
        }
    }
}
