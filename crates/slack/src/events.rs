use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use autoreply_core::domain::user_configuration::UserId;
use autoreply_core::errors::ApplicationError;
use autoreply_db::UserConfigurationRepository;

use crate::signature::constant_time_eq;
use crate::web_api::MessagingClient;

/// Inbound Events API body. The `type` tag selects the payload variant.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event: Option<serde_json::Value>,
        #[serde(default)]
        event_id: Option<String>,
        #[serde(default)]
        team_id: Option<String>,
        #[serde(default)]
        api_app_id: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

impl EventRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, EventHandlerError> {
        serde_json::from_slice(body).map_err(|error| EventHandlerError::Decode(error.to_string()))
    }

    /// `event_id` of a callback, used to correlate log lines for one delivery.
    pub fn correlation_id(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::EventCallback { event_id, .. } => event_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn for_request(request: &EventRequest) -> Self {
        request
            .correlation_id()
            .map(|id| Self { correlation_id: id.to_owned() })
            .unwrap_or_default()
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Challenge { challenge: String },
    Sent { user_id: UserId, channel: String },
    Ignored(IgnoreReason),
    Degraded(DegradedReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    BotMessage,
    MissingSender,
    NoConfiguration,
}

/// Terminal states that still acknowledge the delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DegradedReason {
    StorageUnavailable(String),
    StorageFailed(String),
    SendFailed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("invalid verification token")]
    InvalidToken,
    #[error("unsupported payload type")]
    InvalidType,
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("malformed event payload: {0}")]
    Decode(String),
}

impl From<EventHandlerError> for ApplicationError {
    fn from(error: EventHandlerError) -> Self {
        ApplicationError::InvalidRequest(error.to_string())
    }
}

pub struct EventCallbackHandler {
    verification_token: SecretString,
    store: Arc<dyn UserConfigurationRepository>,
    messenger: Arc<dyn MessagingClient>,
}

impl EventCallbackHandler {
    pub fn new(
        verification_token: SecretString,
        store: Arc<dyn UserConfigurationRepository>,
        messenger: Arc<dyn MessagingClient>,
    ) -> Self {
        Self { verification_token, store, messenger }
    }

    pub async fn handle(
        &self,
        request: EventRequest,
        ctx: &EventContext,
    ) -> Result<EventOutcome, EventHandlerError> {
        let provided = request.token.as_deref().unwrap_or_default();
        if !constant_time_eq(provided.as_bytes(), self.verification_token.expose_secret().as_bytes())
        {
            warn!(
                event_name = "ingress.slack.event_rejected",
                correlation_id = %ctx.correlation_id,
                reason = "invalid_token",
                "rejected event with invalid verification token"
            );
            return Err(EventHandlerError::InvalidToken);
        }

        match request.payload {
            EventPayload::UrlVerification { challenge } => {
                info!(
                    event_name = "ingress.slack.url_verification",
                    correlation_id = %ctx.correlation_id,
                    "answering url verification challenge"
                );
                Ok(EventOutcome::Challenge { challenge })
            }
            EventPayload::EventCallback { event, team_id, .. } => {
                info!(
                    event_name = "ingress.slack.event_received",
                    correlation_id = %ctx.correlation_id,
                    team_id = team_id.as_deref().unwrap_or_default(),
                    "event callback received"
                );
                let event = event
                    .ok_or_else(|| EventHandlerError::InvalidEvent("missing event".to_owned()))?;
                match serde_json::from_value::<InnerEvent>(event) {
                    Ok(InnerEvent::Message(message)) => self.handle_message(message, ctx).await,
                    Ok(InnerEvent::Other) => {
                        Err(EventHandlerError::InvalidEvent("event type is not message".to_owned()))
                    }
                    Err(error) => Err(EventHandlerError::InvalidEvent(error.to_string())),
                }
            }
            EventPayload::Unsupported => Err(EventHandlerError::InvalidType),
        }
    }

    async fn handle_message(
        &self,
        message: MessageEvent,
        ctx: &EventContext,
    ) -> Result<EventOutcome, EventHandlerError> {
        if message.bot_id.is_some() {
            debug!(
                event_name = "ingress.slack.bot_message_ignored",
                correlation_id = %ctx.correlation_id,
                "ignoring bot-originated message"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::BotMessage));
        }

        let Some(user_id) = message.user.as_deref().and_then(|raw| UserId::parse(raw).ok()) else {
            debug!(
                event_name = "ingress.slack.sender_missing",
                correlation_id = %ctx.correlation_id,
                subtype = message.subtype.as_deref().unwrap_or_default(),
                "ignoring message without a sender"
            );
            return Ok(EventOutcome::Ignored(IgnoreReason::MissingSender));
        };

        let channel = message
            .channel
            .filter(|channel| !channel.trim().is_empty())
            .ok_or_else(|| EventHandlerError::InvalidEvent("message without channel".to_owned()))?;

        let configuration = match self.store.get(&user_id).await {
            Ok(Some(configuration)) => configuration,
            Ok(None) => return Ok(EventOutcome::Ignored(IgnoreReason::NoConfiguration)),
            Err(error) => {
                warn!(
                    event_name = "ingress.slack.lookup_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user_id,
                    error = %error,
                    "reply configuration lookup failed; acknowledging without reply"
                );
                let reason = if error.is_unavailable() {
                    DegradedReason::StorageUnavailable(error.to_string())
                } else {
                    DegradedReason::StorageFailed(error.to_string())
                };
                return Ok(EventOutcome::Degraded(reason));
            }
        };

        match self.messenger.send_message(&channel, &configuration.reply_message).await {
            Ok(()) => {
                info!(
                    event_name = "egress.slack.reply_sent",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user_id,
                    channel = %channel,
                    "auto-reply sent"
                );
                Ok(EventOutcome::Sent { user_id, channel })
            }
            Err(error) => {
                warn!(
                    event_name = "egress.slack.reply_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user_id,
                    channel = %channel,
                    error = %error,
                    "auto-reply send failed"
                );
                Ok(EventOutcome::Degraded(DegradedReason::SendFailed(error.to_string())))
            }
        }
    }
}
