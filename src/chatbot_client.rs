use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};
use url::Url;

use crate::conversation_state::{ConversationState, Message};
use crate::error::ChatError;

/// Local development server address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Returned by [`ConversationClient::send`] in place of a reply when the exchange fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Generation parameters attached to every request. They never depend on
/// conversation content.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Body of `POST {endpoint}/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, settings: &GenerationSettings) -> Self {
        Self {
            messages,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Successful body of `POST {endpoint}/chat`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Body of `GET {endpoint}/health`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One request/response exchange with a chat-completion service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

/// [`ChatBackend`] speaking JSON over HTTP.
pub struct HttpBackend {
    endpoint: String,
    chat_url: Url,
    health_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(endpoint: &str) -> Result<Self, ChatError> {
        Self::with_timeout(endpoint, None)
    }

    /// Like [`HttpBackend::new`], but every request gives up after `timeout`
    /// when one is set.
    pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ChatError> {
        let base = endpoint.trim().trim_end_matches('/');
        let invalid = |reason: String| ChatError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        // `localhost:8000` parses with `localhost` as its scheme
        let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme '{}', expected http or https",
                parsed.scheme()
            )));
        }
        let chat_url = Url::parse(&format!("{base}/chat")).map_err(|e| invalid(e.to_string()))?;
        let health_url =
            Url::parse(&format!("{base}/health")).map_err(|e| invalid(e.to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            endpoint: base.to_string(),
            chat_url,
            health_url,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Probe the service's health route.
    pub async fn health_check(&self) -> Result<HealthStatus, ChatError> {
        debug!("Checking service health at {}", self.health_url);

        let response = self.client.get(self.health_url.clone()).send().await?;
        decode_response(response).await
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        if let Ok(body) = serde_json::to_string_pretty(request) {
            debug!("Sending request to {}: {}", self.chat_url, body);
        }

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(request)
            .send()
            .await?;

        let reply: ChatResponse = decode_response(response).await?;

        if let Some(usage) = &reply.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Received reply"
            );
        }

        Ok(reply)
    }
}

async fn decode_response<T>(response: reqwest::Response) -> Result<T, ChatError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ChatError::Status { status, body });
    }

    debug!("Received response: {}", body);

    serde_json::from_str(&body).map_err(|source| ChatError::Decode { body, source })
}

/// Owns a conversation with one remote endpoint.
///
/// Every [`send`](ConversationClient::send) appends the user's turn, posts the
/// whole history together with the [`GenerationSettings`], and appends the
/// reply. Sends on a shared client run strictly one after another: the
/// history lock is held for the full exchange, so a queued send only sees
/// turns that have already completed.
pub struct ConversationClient<B = HttpBackend> {
    backend: B,
    settings: GenerationSettings,
    state: Mutex<ConversationState>,
}

impl ConversationClient<HttpBackend> {
    /// Client for `endpoint` with the default generation settings.
    pub fn new(endpoint: &str) -> Result<Self, ChatError> {
        Ok(Self::with_backend(
            HttpBackend::new(endpoint)?,
            GenerationSettings::default(),
        ))
    }
}

impl<B: ChatBackend> ConversationClient<B> {
    pub fn with_backend(backend: B, settings: GenerationSettings) -> Self {
        Self {
            backend,
            settings,
            state: Mutex::new(ConversationState::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Send `text` as the next user turn and return the assistant's reply.
    ///
    /// Failures never reach the caller: they are logged and [`FALLBACK_REPLY`]
    /// is returned instead. The user turn stays in the history either way, but
    /// no assistant turn is recorded for a failed exchange.
    pub async fn send(&self, text: &str) -> String {
        match self.try_send(text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(status = ?e.status(), "Error sending message: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Same history effects as [`send`](ConversationClient::send), with the
    /// failure handed back as a typed error.
    pub async fn try_send(&self, text: &str) -> Result<String, ChatError> {
        let mut state = self.state.lock().await;
        state.add_user_message(text);

        let request = ChatRequest::new(state.get_messages().to_vec(), &self.settings);
        debug!(turns = request.messages.len(), model = %request.model, "Sending chat request");

        let reply = self.backend.complete(&request).await?;
        state.add_assistant_message(&reply.message);

        Ok(reply.message)
    }

    pub async fn clear_history(&self) {
        self.state.lock().await.clear();
    }

    /// Copy of the current history.
    pub async fn history(&self) -> Vec<Message> {
        self.state.lock().await.snapshot()
    }
}
