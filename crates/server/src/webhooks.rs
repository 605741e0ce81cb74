use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use autoreply_core::errors::{ApplicationError, InterfaceError};
use autoreply_slack::{
    commands::{CommandRouter, SlashCommandPayload},
    events::{EventCallbackHandler, EventContext, EventOutcome, EventRequest},
    signature::{RequestVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

const UNKNOWN_CORRELATION_ID: &str = "unknown-correlation-id";

#[derive(Clone)]
pub struct WebhookState {
    events: Arc<EventCallbackHandler>,
    commands: Arc<CommandRouter>,
    verifier: Option<RequestVerifier>,
}

impl WebhookState {
    pub fn new(
        events: EventCallbackHandler,
        commands: CommandRouter,
        verifier: Option<RequestVerifier>,
    ) -> Self {
        Self { events: Arc::new(events), commands: Arc::new(commands), verifier }
    }

    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), ApplicationError> {
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };

        verifier
            .verify(
                header_value(headers, TIMESTAMP_HEADER),
                header_value(headers, SIGNATURE_HEADER),
                body,
                Utc::now().timestamp(),
            )
            .map_err(|error| ApplicationError::Unauthenticated(error.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/slack/events", post(receive_event))
        .route("/event", post(receive_event))
        .route("/slack/commands", post(receive_command))
        .route("/command", post(receive_command))
        .with_state(state)
}

async fn receive_event(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(error) = state.verify(&headers, &body) {
        return error_response(error, UNKNOWN_CORRELATION_ID);
    }

    let request = match EventRequest::from_json(&body) {
        Ok(request) => request,
        Err(error) => return error_response(error.into(), UNKNOWN_CORRELATION_ID),
    };
    let ctx = EventContext::for_request(&request);

    match state.events.handle(request, &ctx).await {
        Ok(EventOutcome::Challenge { challenge }) => {
            Json(ChallengeResponse { challenge }).into_response()
        }
        Ok(_) => StatusCode::OK.into_response(),
        Err(error) => error_response(error.into(), &ctx.correlation_id),
    }
}

async fn receive_command(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(error) = state.verify(&headers, &body) {
        return error_response(error, UNKNOWN_CORRELATION_ID);
    }

    let payload = match SlashCommandPayload::from_form(&body) {
        Ok(payload) => payload,
        Err(error) => return error_response(error.into(), UNKNOWN_CORRELATION_ID),
    };
    let correlation_id = payload.correlation_id().to_owned();

    match state.commands.route(payload).await {
        Ok(reply) => (StatusCode::OK, reply.text()).into_response(),
        Err(error) => error_response(error.into(), &correlation_id),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub(crate) fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: ApplicationError, correlation_id: &str) -> Response {
    let error = error.into_interface(correlation_id);
    let status = status_for(&error);

    warn!(
        event_name = "ingress.slack.request_rejected",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        error = %error,
        "webhook request rejected"
    );

    let body = WebhookError {
        error: error.message().to_owned(),
        correlation_id: error.correlation_id().to_owned(),
    };
    (status, Json(body)).into_response()
}
