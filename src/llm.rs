use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyst::{CompletionProvider, ReportError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Text of the first choice plus the reason the model stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
}

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn from_env() -> Result<Self, ReportError> {
        let base_url =
            dotenv::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = dotenv::var("LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ReportError::Config("LLM_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .map_err(|e| ReportError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") || base.ends_with("/openai") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<Completion, ReportError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.6,
            "max_tokens": 8192,
        });

        debug!(model = %self.model, messages = messages.len(), "Sending chat completion");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::Provider(format!("network error: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ReportError::Provider(format!("network error: {}", e)))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            return Err(ReportError::Provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        parse_completion(&text)
    }
}

/// Pull `choices[0].message.content` and `finish_reason` out of a response
/// body. A null content is treated as empty text.
fn parse_completion(body: &str) -> Result<Completion, ReportError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ReportError::Provider(format!("invalid response JSON: {}", e)))?;

    let choice = json["choices"].get(0);
    let text = choice
        .and_then(|c| c["message"]["content"].as_str())
        .unwrap_or("")
        .to_string();
    let finish_reason = choice
        .and_then(|c| c["finish_reason"].as_str())
        .map(str::to_string);

    Ok(Completion {
        text,
        finish_reason,
    })
}

impl CompletionProvider for LlmClient {
    fn complete<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> BoxFuture<'a, Result<Completion, ReportError>> {
        Box::pin(self.chat(messages))
    }
}
