use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subtext_common::{Result, SubtextError};
use subtext_http::{Auth, HttpClient, HttpError, RequestOpts};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a precise, neutral text analyst.";

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    json_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl OpenAiClient {
    /// Create a new client for the given API key and model against the public
    /// OpenAI endpoint.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(api_key, model, OPENAI_API_BASE)
    }

    /// Create a client against an OpenAI-compatible gateway.
    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SubtextError::Config(
                "OpenAI API key is missing (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(SubtextError::Config("model id is empty".to_string()));
        }
        let client = HttpClient::new(base_url)
            .map_err(|e| SubtextError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            json_mode: true,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.client = self.client.with_retries(retries);
        self
    }

    /// Ask the provider for a JSON object response (`response_format`).
    pub fn with_json_mode(mut self, on: bool) -> Self {
        self.json_mode = on;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.unwrap_or(FALLBACK_SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature,
            response_format: self.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            json_mode = self.json_mode,
            "llm.openai.generate.start"
        );

        let resp: ChatResponse = self
            .client
            .post_json_opts(
                "chat/completions",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_subtext)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SubtextError::Provider("completion returned no choices".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SubtextError::Provider(format!(
                "completion returned no content (finish_reason={})",
                choice.finish_reason.as_deref().unwrap_or("-")
            )));
        }

        let tokens_used = resp.usage.as_ref().map(|u| u.total_tokens);
        tracing::debug!(
            id = resp.id.as_deref().unwrap_or("-"),
            tokens_used = ?tokens_used,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("-"),
            "llm.openai.generate.done"
        );

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used,
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub(crate) fn http_to_subtext(e: HttpError) -> SubtextError {
    match e {
        HttpError::Api { status, message, .. } if status.as_u16() == 429 => {
            tracing::warn!(%message, "llm.rate_limited");
            SubtextError::RateLimit
        }
        HttpError::Api { status, message, .. } if matches!(status.as_u16(), 401 | 403) => {
            SubtextError::Auth(message)
        }
        HttpError::Api { status, message, .. } => {
            SubtextError::Provider(format!("{status}: {message}"))
        }
        HttpError::Timeout(_) => SubtextError::Timeout,
        HttpError::Network(msg) => SubtextError::Network(msg),
        HttpError::Build(msg) => SubtextError::Config(msg),
        other => SubtextError::Provider(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_a_config_error() {
        let err = OpenAiClient::new("  ".into(), "gpt-4.1-mini".into())
            .err()
            .expect("must fail");
        assert!(matches!(err, SubtextError::Config(_)));
    }

    #[test]
    fn request_serializes_json_mode_and_skips_unset_knobs() {
        let req = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: None,
            temperature: Some(0.2),
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["response_format"]["type"], "json_object");
        assert!(v.get("max_tokens").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
    }

    #[test]
    fn status_codes_map_to_failure_kinds() {
        let api = |code: u16| HttpError::Api {
            status: reqwest_status(code),
            message: "m".into(),
            request_id: "-".into(),
        };
        assert!(matches!(http_to_subtext(api(429)), SubtextError::RateLimit));
        assert!(matches!(http_to_subtext(api(401)), SubtextError::Auth(_)));
        assert!(matches!(http_to_subtext(api(500)), SubtextError::Provider(_)));
        assert!(matches!(
            http_to_subtext(HttpError::Timeout(Duration::from_secs(1))),
            SubtextError::Timeout
        ));
    }

    fn reqwest_status(code: u16) -> subtext_http::StatusCode {
        subtext_http::StatusCode::from_u16(code).unwrap()
    }
}
