use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Models offered by the workbench
pub const AVAILABLE_MODELS: [&str; 3] = ["gpt-4o-mini", "gpt-4o", "gpt-3.5-turbo"];

/// Model used for the credential check
pub const CREDENTIAL_CHECK_MODEL: &str = "gpt-3.5-turbo";
const CREDENTIAL_CHECK_MAX_TOKENS: u32 = 5;

/// Sampling settings shared by every call in a session
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response (100-4000)
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_message: String,
    pub user_prompt: String,
}

impl ModelRequest {
    pub fn new(settings: &ModelSettings, system_message: &str, user_prompt: &str) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_message: system_message.to_string(),
            user_prompt: user_prompt.to_string(),
        }
    }

    /// Minimal request used to check that a credential is accepted
    pub fn credential_check() -> Self {
        Self {
            model: CREDENTIAL_CHECK_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: CREDENTIAL_CHECK_MAX_TOKENS,
            system_message: String::new(),
            user_prompt: "Hello".to_string(),
        }
    }
}

/// Boundary to the remote language model service.
///
/// One request per call: no retry, no streaming, no caching. Temperature and
/// token limits are passed through as given.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(
        &self,
        credential: &str,
        request: &ModelRequest,
    ) -> Result<String, GatewayError>;
}

/// Configuration for the chat completions client
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,
}

impl GatewayConfig {
    /// Create config from environment variables (OPENAI_BASE_URL)
    pub fn from_env() -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAiGateway {
    client: Client,
    config: GatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn invoke(
        &self,
        credential: &str,
        request: &ModelRequest,
    ) -> Result<String, GatewayError> {
        let body = ChatCompletionRequest::from_request(request);

        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            prompt_chars = request.user_prompt.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::new(format!("{} - {}", status, body)));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::new(format!("Failed to parse model response: {}", e)))?;

        response.into_text()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_request(request: &'a ModelRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !request.system_message.is_empty() {
            messages.push(Message {
                role: "system",
                content: &request.system_message,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.user_prompt,
        });

        Self {
            model: &request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages,
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_text(self) -> Result<String, GatewayError> {
        self.choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::new("No choices in model response"))
            .map(|choice| choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let settings = ModelSettings::default();
        let request = ModelRequest::new(&settings, "system text", "user text");
        let body = serde_json::to_value(ChatCompletionRequest::from_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 2000);
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < f64::EPSILON);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user text");
    }

    #[test]
    fn test_credential_check_has_no_system_message() {
        let request = ModelRequest::credential_check();
        let body = serde_json::to_value(ChatCompletionRequest::from_request(&request)).unwrap();

        assert_eq!(body["model"], CREDENTIAL_CHECK_MODEL);
        assert_eq!(body["max_tokens"], 5);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "Job Title: Engineer"}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "Job Title: Engineer");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(
            empty.into_text().unwrap_err(),
            GatewayError::new("No choices in model response")
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = GatewayConfig::new("http://localhost:8080/v1/");
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
