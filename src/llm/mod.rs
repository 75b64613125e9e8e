//! Chat-completion service interface.
//!
//! A [`ChatService`] turns an ordered list of role-tagged messages into raw
//! response text. Transport and quota failures surface as [`ServiceError`]
//! and are propagated to the caller unmodified; nothing here retries.

pub mod client;
pub mod decode;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::QueryClient;
pub use decode::{decode, DecodeError};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Failures from the external text-generation service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no API key configured (set {0})")]
    MissingApiKey(&'static str),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("quota exhausted or rate limited (HTTP {status})")]
    Quota { status: u16 },

    #[error("service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed service response: {0}")]
    MalformedResponse(String),
}

/// Trait for chat-completion backends
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Send an ordered message list, returning the raw assistant text
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ServiceError>;
}

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completion backend over HTTP
pub struct OpenAiService {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiService {
    /// Create a service for `model`, reading the API key from the environment
    pub fn from_env(model: impl Into<String>) -> Result<Self, ServiceError> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| ServiceError::MissingApiKey(API_KEY_ENV))?;
        Ok(Self::new(model, api_key))
    }

    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatService for OpenAiService {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
            // Extraction wants reproducible output
            temperature: 0.0,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 402 {
            return Err(ServiceError::Quota {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ServiceError::MalformedResponse("response carried no message content".to_string())
            })
    }
}
