use std::sync::Arc;
use std::time::Duration;

use autoreply_core::config::{AppConfig, ConfigError, LoadOptions};
use autoreply_db::{
    connect_with_settings, migrations, DbPool, SqlUserConfigurationRepository,
    UserConfigurationRepository,
};
use autoreply_slack::{
    commands::CommandRouter,
    events::EventCallbackHandler,
    signature::RequestVerifier,
    web_api::{MessagingClient, NoopMessagingClient, SendError, SlackWebClient},
};
use axum::Router;
use thiserror::Error;
use tracing::info;

use crate::{health, webhooks};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack client initialization failed: {0}")]
    Messaging(#[source] SendError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let messenger = messaging_client(&config)?;
    let router = build_router(&config, db_pool.clone(), messenger);

    Ok(Application { config, db_pool, router })
}

fn messaging_client(config: &AppConfig) -> Result<Arc<dyn MessagingClient>, BootstrapError> {
    if config.slack.dry_run {
        info!(
            event_name = "system.bootstrap.slack_transport",
            correlation_id = "bootstrap",
            transport_mode = "noop",
            "slack dry run enabled; replies will only be logged"
        );
        return Ok(Arc::new(NoopMessagingClient));
    }

    let client = SlackWebClient::new(
        config.slack.bot_token.clone(),
        config.slack.api_base_url.clone(),
        Duration::from_secs(config.slack.timeout_secs),
    )
    .map_err(BootstrapError::Messaging)?;
    info!(
        event_name = "system.bootstrap.slack_transport",
        correlation_id = "bootstrap",
        transport_mode = "web_api",
        api_base_url = %config.slack.api_base_url,
        "slack web api client initialized"
    );
    Ok(Arc::new(client))
}

pub fn build_router(
    config: &AppConfig,
    db_pool: DbPool,
    messenger: Arc<dyn MessagingClient>,
) -> Router {
    let store: Arc<dyn UserConfigurationRepository> =
        Arc::new(SqlUserConfigurationRepository::with_operation_timeout(
            db_pool.clone(),
            Duration::from_secs(config.database.timeout_secs),
        ));
    let verification_token = config.slack.verification_token.clone();

    let state = webhooks::WebhookState::new(
        EventCallbackHandler::new(verification_token.clone(), Arc::clone(&store), messenger),
        CommandRouter::new(verification_token, store),
        config.slack.signing_secret.clone().map(RequestVerifier::new),
    );

    webhooks::router(state).merge(health::router(db_pool))
}

#[cfg(test)]
mod tests {
    use autoreply_core::config::{ConfigOverrides, LoadOptions};
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap;

    fn dry_run_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_verification_token: Some("verification-token".to_string()),
                slack_bot_token: Some(String::new()),
                slack_dry_run: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_with_invalid_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_verification_token: Some("verification-token".to_string()),
                slack_bot_token: Some("xapp-not-a-bot-token".to_string()),
                slack_dry_run: Some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_in_dry_run_serves_commands_and_health() {
        let app = bootstrap(dry_run_overrides("sqlite::memory:"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_configuration'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema lookup");
        assert_eq!(table_count, 1, "bootstrap should apply migrations");

        let command = app
            .router
            .clone()
            .oneshot(
                Request::post("/slack/commands")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("token=verification-token&user_id=U1&text=brb"))
                    .expect("request"),
            )
            .await
            .expect("command response");
        assert_eq!(command.status(), StatusCode::OK);
        let body = to_bytes(command.into_body(), usize::MAX).await.expect("body");
        assert!(String::from_utf8_lossy(&body).starts_with("Auto-reply enabled"));

        let stored: String = sqlx::query_scalar(
            "SELECT reply_message FROM user_configuration WHERE user_id = 'U1'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("stored reply");
        assert_eq!(stored, "brb");

        let health = app
            .router
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(health.status(), StatusCode::OK);

        app.db_pool.close().await;
    }
}
