use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};
use autoreply_core::errors::ApplicationError;
use autoreply_db::UserConfigurationRepository;

use crate::signature::constant_time_eq;

pub const ENABLED_MESSAGE: &str =
    "Auto-reply enabled! I'll answer messages sent to you with your reply.";
pub const UNABLE_MESSAGE: &str = "Sorry, I was unable to do this. Please try again.";
pub const USAGE_MESSAGE: &str =
    "Usage: /autoreply <message> sets the reply sent when someone messages you.";

/// Form fields Slack posts for a slash command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlashCommandPayload {
    pub token: String,
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub trigger_id: String,
    pub api_app_id: String,
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
}

impl SlashCommandPayload {
    pub fn from_form(body: &[u8]) -> Result<Self, CommandHandlerError> {
        serde_urlencoded::from_bytes(body)
            .map_err(|error| CommandHandlerError::Decode(error.to_string()))
    }

    pub fn correlation_id(&self) -> &str {
        if self.trigger_id.is_empty() {
            "unknown-correlation-id"
        } else {
            &self.trigger_id
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandReply {
    Enabled,
    NotModified,
    Failed,
    Usage,
}

impl CommandReply {
    pub fn text(self) -> &'static str {
        match self {
            Self::Enabled => ENABLED_MESSAGE,
            Self::NotModified | Self::Failed => UNABLE_MESSAGE,
            Self::Usage => USAGE_MESSAGE,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandHandlerError {
    #[error("invalid verification token")]
    InvalidToken,
    #[error("malformed command payload: {0}")]
    Decode(String),
}

impl From<CommandHandlerError> for ApplicationError {
    fn from(error: CommandHandlerError) -> Self {
        ApplicationError::InvalidRequest(error.to_string())
    }
}

pub struct CommandRouter {
    verification_token: SecretString,
    store: Arc<dyn UserConfigurationRepository>,
}

impl CommandRouter {
    pub fn new(verification_token: SecretString, store: Arc<dyn UserConfigurationRepository>) -> Self {
        Self { verification_token, store }
    }

    pub async fn route(
        &self,
        payload: SlashCommandPayload,
    ) -> Result<CommandReply, CommandHandlerError> {
        let correlation_id = payload.correlation_id().to_owned();
        if !constant_time_eq(
            payload.token.as_bytes(),
            self.verification_token.expose_secret().as_bytes(),
        ) {
            warn!(
                event_name = "ingress.slack.command_rejected",
                correlation_id = %correlation_id,
                reason = "invalid_token",
                "rejected slash command with invalid verification token"
            );
            return Err(CommandHandlerError::InvalidToken);
        }

        let Ok(user_id) = UserId::parse(&payload.user_id) else {
            warn!(
                event_name = "ingress.slack.command_without_user",
                correlation_id = %correlation_id,
                "slash command carried no user id"
            );
            return Ok(CommandReply::Failed);
        };
        let Ok(configuration) = UserConfiguration::from_command_text(user_id, &payload.text) else {
            return Ok(CommandReply::Usage);
        };

        info!(
            event_name = "ingress.slack.command_received",
            correlation_id = %correlation_id,
            command = %payload.command,
            user_id = %configuration.user_id,
            "storing auto-reply configuration"
        );

        let user_id = configuration.user_id.clone();
        match self.store.put(configuration).await {
            Ok(true) => Ok(CommandReply::Enabled),
            Ok(false) => {
                info!(
                    event_name = "store.user_configuration.unchanged",
                    correlation_id = %correlation_id,
                    user_id = %user_id,
                    "reply configuration already matched"
                );
                Ok(CommandReply::NotModified)
            }
            Err(error) => {
                warn!(
                    event_name = "ingress.slack.command_store_failed",
                    correlation_id = %correlation_id,
                    user_id = %user_id,
                    error = %error,
                    "could not store reply configuration"
                );
                Ok(CommandReply::Failed)
            }
        }
    }
}
