pub mod chat;

use std::io::Write;
use std::time::Duration;

use clap::Args;
use eyre::Result;
use tracing::error;

use crate::chatbot_client::{
    ConversationClient, GenerationSettings, HttpBackend, DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use crate::error::ChatError;

/// Connection and generation settings, from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// Base URL of the chat service
    #[arg(long, env = "CHATBOT_API_URL", default_value = DEFAULT_ENDPOINT, global = true)]
    pub api_url: String,

    /// Model identifier sent with every request
    #[arg(long, env = "CHATBOT_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Sampling temperature sent with every request
    #[arg(long, env = "CHATBOT_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f64,

    /// Token budget for each reply
    #[arg(long, env = "CHATBOT_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS, global = true)]
    pub max_tokens: u32,

    /// Give up on a request after this many seconds (no limit when unset)
    #[arg(long, env = "CHATBOT_TIMEOUT", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

impl ClientArgs {
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn backend(&self) -> Result<HttpBackend, ChatError> {
        HttpBackend::with_timeout(&self.api_url, self.timeout.map(Duration::from_secs))
    }

    pub fn build_client(&self) -> Result<ConversationClient, ChatError> {
        Ok(ConversationClient::with_backend(
            self.backend()?,
            self.generation_settings(),
        ))
    }
}

/// Probe `/health` and report the outcome. `true` only for a healthy service.
pub async fn check_health(output: &mut dyn Write, backend: &HttpBackend) -> Result<bool> {
    match backend.health_check().await {
        Ok(health) if health.is_healthy() => {
            writeln!(output, "{} is healthy", backend.endpoint())?;
            Ok(true)
        }
        Ok(health) => {
            writeln!(
                output,
                "{} reported status: {}",
                backend.endpoint(),
                health.status
            )?;
            Ok(false)
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            writeln!(output, "{} is unreachable: {}", backend.endpoint(), e)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        client: ClientArgs,
    }

    #[test]
    fn flags_override_defaults() {
        let cli = TestCli::parse_from([
            "chatbot",
            "--api-url",
            "http://chat.internal:9000/",
            "--model",
            "other",
            "--temperature",
            "0.1",
            "--max-tokens",
            "64",
            "--timeout",
            "5",
        ]);

        let settings = cli.client.generation_settings();
        assert_eq!(settings.model, "other");
        assert_eq!(settings.temperature, 0.1);
        assert_eq!(settings.max_tokens, 64);
        assert_eq!(cli.client.timeout, Some(5));

        let client = cli.client.build_client().unwrap();
        assert_eq!(client.backend().endpoint(), "http://chat.internal:9000");
    }

    #[tokio::test]
    async fn unhealthy_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"degraded"}"#)
            .create_async()
            .await;

        let backend = HttpBackend::new(&server.url()).unwrap();
        let mut out = Vec::new();
        let healthy = check_health(&mut out, &backend).await.unwrap();

        assert!(!healthy);
        assert!(String::from_utf8(out).unwrap().contains("degraded"));
    }

    #[tokio::test]
    async fn healthy_status_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy"}"#)
            .create_async()
            .await;

        let backend = HttpBackend::new(&server.url()).unwrap();
        let mut out = Vec::new();
        let healthy = check_health(&mut out, &backend).await.unwrap();

        assert!(healthy);
    }
}
