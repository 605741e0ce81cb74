use std::time::Duration;

use autoreply_core::config::AppConfig;
use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};
use autoreply_db::{
    connect_with_settings, migrations, SqlUserConfigurationRepository,
    UserConfigurationRepository,
};

use crate::commands::{load_config, runtime, CommandResult};

type Failure = (&'static str, String, u8);

pub fn show(user: &str) -> CommandResult {
    const COMMAND: &str = "reply.show";

    let user_id = match UserId::parse(user) {
        Ok(user_id) => user_id,
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 7),
    };

    let outcome = with_repository(COMMAND, |repo| async move {
        repo.get(&user_id).await.map_err(|error| ("storage", error.to_string(), 6u8)).map(
            |found| match found {
                Some(configuration) => format!(
                    "reply for `{}`: {}",
                    configuration.user_id, configuration.reply_message
                ),
                None => format!("no reply configured for `{user_id}`"),
            },
        )
    });

    match outcome {
        Ok(message) => CommandResult::success(COMMAND, message),
        Err(failure) => failure,
    }
}

pub fn set(user: &str, text: &str) -> CommandResult {
    const COMMAND: &str = "reply.set";

    let configuration = match UserId::parse(user)
        .and_then(|user_id| UserConfiguration::from_command_text(user_id, text))
    {
        Ok(configuration) => configuration,
        Err(error) => return CommandResult::failure(COMMAND, "invalid_input", error.to_string(), 7),
    };

    let outcome = with_repository(COMMAND, |repo| async move {
        let user_id = configuration.user_id.clone();
        repo.put(configuration)
            .await
            .map(|changed| format!("stored reply for `{user_id}` (changed: {changed})"))
            .map_err(|error| ("storage", error.to_string(), 6u8))
    });

    match outcome {
        Ok(message) => CommandResult::success(COMMAND, message),
        Err(failure) => failure,
    }
}

/// Connects, applies pending migrations, and hands a store to `operation`.
fn with_repository<F, Fut>(command: &str, operation: F) -> Result<String, CommandResult>
where
    F: FnOnce(SqlUserConfigurationRepository) -> Fut,
    Fut: std::future::Future<Output = Result<String, Failure>>,
{
    let config: AppConfig = load_config(command)?;
    let runtime = runtime(command)?;

    runtime
        .block_on(async {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;

            let repo = SqlUserConfigurationRepository::with_operation_timeout(
                pool.clone(),
                Duration::from_secs(config.database.timeout_secs),
            );
            let result = operation(repo).await;
            pool.close().await;
            result
        })
        .map_err(|(error_class, message, exit_code)| {
            CommandResult::failure(command, error_class, message, exit_code)
        })
}
