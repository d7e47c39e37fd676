//! LLM client for chunk annotation.
//!
//! Supports Azure OpenAI deployments, OpenAI-compatible chat completion APIs
//! and Ollama for local inference.

mod config;
mod prompts;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::retry::{backoff_delay, parse_retry_after};

pub use config::{LlmConfig, LlmProvider};
pub use prompts::DEFAULT_STIX_PROMPT;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error status
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    /// Service asked us to slow down
    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// No usable API key
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// OpenAI chat completion request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI chat completion response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// LLM client for single-turn completions.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Create a new LLM client, resolving endpoint and credentials up front.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let endpoint = config.resolved_endpoint()?;
        let api_key = config.resolve_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            endpoint,
            api_key,
        })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Submit a single-turn prompt and return the generated text.
    ///
    /// Transient failures are retried up to `max_retries` times with
    /// exponential backoff; a `Retry-After` from the service takes precedence.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let wait = match &e {
                        LlmError::RateLimited {
                            retry_after_secs: Some(secs),
                        } => Duration::from_secs(*secs),
                        _ => backoff_delay(attempt, self.config.retry_base_ms),
                    };
                    warn!(
                        "LLM request failed (attempt {}): {}, retrying in {:?}",
                        attempt + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, prompt: &str) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::OpenAI | LlmProvider::Azure => self.call_chat(prompt).await,
            LlmProvider::Ollama => self.call_ollama(prompt).await,
        }
    }

    /// Chat completions URL for the configured provider.
    fn chat_url(&self) -> String {
        match self.config.provider {
            LlmProvider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, self.config.model, self.config.api_version
            ),
            _ => format!("{}/v1/chat/completions", self.endpoint),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.provider, &self.api_key) {
            (LlmProvider::Azure, Some(key)) => request.header("api-key", key),
            (_, Some(key)) => request.bearer_auth(key),
            (_, None) => request,
        }
    }

    /// Call an OpenAI-style chat completions endpoint with one user message.
    async fn call_chat(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.chat_url();
        debug!("POST {}", url);
        let resp = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let resp = check_status(resp).await?;
        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("response contained no completion text".to_string()))
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        let resp = check_status(resp).await?;
        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }
}

/// Map non-success statuses to errors, keeping 429 distinct for retry.
async fn check_status(resp: Response) -> Result<Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status.as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        return Err(LlmError::RateLimited {
            retry_after_secs: parse_retry_after(retry_after).map(|d| d.as_secs()),
        });
    }

    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(provider: LlmProvider, endpoint: &str) -> LlmClient {
        LlmClient::new(LlmConfig {
            provider,
            endpoint: Some(endpoint.to_string()),
            model: "gpt4ce".to_string(),
            api_key: Some("key".to_string()),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_chat_urls() {
        let azure = client(LlmProvider::Azure, "https://gpt.openai.azure.com/");
        assert_eq!(
            azure.chat_url(),
            "https://gpt.openai.azure.com/openai/deployments/gpt4ce/chat/completions?api-version=2024-02-01"
        );

        let openai = client(LlmProvider::OpenAI, "https://api.groq.com/openai");
        assert_eq!(
            openai.chat_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(LlmError::Connection("reset".into()).is_transient());
        assert!(LlmError::RateLimited {
            retry_after_secs: None
        }
        .is_transient());
        assert!(LlmError::Api {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!LlmError::Api {
            status: 401,
            body: String::new()
        }
        .is_transient());
        assert!(!LlmError::Parse("bad json".into()).is_transient());
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "gpt4ce",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 2000,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 2000);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_missing_key_fails_construction() {
        let result = LlmClient::new(LlmConfig::default());
        assert!(matches!(result, Err(LlmError::MissingCredentials(_))));
    }
}
