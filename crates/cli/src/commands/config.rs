use std::env;
use std::fs;
use std::path::Path;

use autoreply_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["AUTOREPLY_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["AUTOREPLY_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["AUTOREPLY_DATABASE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "slack.verification_token",
        &redact_secret(config.slack.verification_token.expose_secret()),
        source("slack.verification_token", &["AUTOREPLY_SLACK_VERIFICATION_TOKEN"]),
    ));
    lines.push(render_line(
        "slack.bot_token",
        &redact_token(config.slack.bot_token.expose_secret()),
        source("slack.bot_token", &["AUTOREPLY_SLACK_BOT_TOKEN"]),
    ));
    let signing_secret = match &config.slack.signing_secret {
        Some(secret) => redact_secret(secret.expose_secret()),
        None => "<unset>".to_string(),
    };
    lines.push(render_line(
        "slack.signing_secret",
        &signing_secret,
        source("slack.signing_secret", &["AUTOREPLY_SLACK_SIGNING_SECRET"]),
    ));
    lines.push(render_line(
        "slack.api_base_url",
        &config.slack.api_base_url,
        source("slack.api_base_url", &["AUTOREPLY_SLACK_API_BASE_URL"]),
    ));
    lines.push(render_line(
        "slack.timeout_secs",
        &config.slack.timeout_secs.to_string(),
        source("slack.timeout_secs", &["AUTOREPLY_SLACK_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "slack.dry_run",
        &config.slack.dry_run.to_string(),
        source("slack.dry_run", &["AUTOREPLY_SLACK_DRY_RUN"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["AUTOREPLY_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["AUTOREPLY_SERVER_PORT"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["AUTOREPLY_LOGGING_LEVEL", "AUTOREPLY_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["AUTOREPLY_LOGGING_FORMAT", "AUTOREPLY_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
