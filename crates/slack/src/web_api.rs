use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("slack transport failure: {0}")]
    Transport(String),
    #[error("slack api rejected {method}: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack response could not be decoded: {0}")]
    Decode(String),
    #[error("slack client could not be built: {0}")]
    Build(String),
}

/// Outbound messaging collaborator used by the event handler.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SendError>;
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// `chat.postMessage` over HTTPS with a bot token.
pub struct SlackWebClient {
    client: reqwest::Client,
    bot_token: SecretString,
    api_base_url: String,
}

impl SlackWebClient {
    pub fn new(
        bot_token: SecretString,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SendError::Build(error.to_string()))?;
        let api_base_url = api_base_url.into().trim_end_matches('/').to_owned();

        Ok(Self { client, bot_token, api_base_url })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base_url)
    }
}

#[async_trait]
impl MessagingClient for SlackWebClient {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SendError> {
        const METHOD: &str = "chat.postMessage";

        let response = self
            .client
            .post(self.api_url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&PostMessageRequest { channel, text })
            .send()
            .await
            .map_err(|error| SendError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Api { method: METHOD, error: format!("http status {status}") });
        }

        let body: ApiResponse =
            response.json().await.map_err(|error| SendError::Decode(error.to_string()))?;
        if !body.ok {
            return Err(SendError::Api {
                method: METHOD,
                error: body.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        Ok(())
    }
}

/// Logs the would-be message and succeeds. Backs `slack.dry_run`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMessagingClient;

#[async_trait]
impl MessagingClient for NoopMessagingClient {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SendError> {
        info!(
            event_name = "egress.slack.dry_run",
            channel,
            text_len = text.len(),
            "dry run: skipping chat.postMessage"
        );
        Ok(())
    }
}
