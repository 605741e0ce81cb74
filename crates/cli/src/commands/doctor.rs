use std::time::Duration;

use autoreply_core::config::{AppConfig, LoadOptions};
use autoreply_db::{connect_with_settings, SqlUserConfigurationRepository};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;

use crate::commands::current_thread_runtime;

const SKIPPED_WITHOUT_CONFIG: &str = "skipped because configuration did not load";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Verdict {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: Verdict,
    details: String,
}

impl Check {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: Verdict::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: Verdict::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self { name, status: Verdict::Skipped, details: SKIPPED_WITHOUT_CONFIG.to_owned() }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    overall_status: Verdict,
    summary: &'static str,
    checks: Vec<Check>,
}

impl Report {
    fn from_checks(checks: Vec<Check>) -> Self {
        let ready = checks.iter().all(|check| check.status == Verdict::Pass);
        Self {
            overall_status: if ready { Verdict::Pass } else { Verdict::Fail },
            summary: if ready {
                "doctor: autoreply is ready to serve"
            } else {
                "doctor: autoreply is not ready; see failed checks"
            },
            checks,
        }
    }

    fn render_human(&self) -> String {
        std::iter::once(self.summary.to_owned())
            .chain(self.checks.iter().map(|check| {
                let marker = match check.status {
                    Verdict::Pass => "ok",
                    Verdict::Fail => "fail",
                    Verdict::Skipped => "skip",
                };
                format!("- [{marker}] {}: {}", check.name, check.details)
            }))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn run(json_output: bool) -> String {
    let report = Report::from_checks(collect_checks());
    if !json_output {
        return report.render_human();
    }

    serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        json!({
            "overall_status": "fail",
            "summary": "doctor report could not be serialized",
            "error": error.to_string(),
        })
        .to_string()
    })
}

fn collect_checks() -> Vec<Check> {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            Check::pass("config_validation", "configuration loaded and validated"),
            slack_credentials(&config),
            reply_store(&config),
        ],
        Err(error) => vec![
            Check::fail("config_validation", error.to_string()),
            Check::skipped("slack_credentials"),
            Check::skipped("database_connectivity"),
        ],
    }
}

fn slack_credentials(config: &AppConfig) -> Check {
    const NAME: &str = "slack_credentials";
    let slack = &config.slack;

    let delivery = if slack.dry_run {
        "dry run: replies are logged, not posted".to_owned()
    } else if slack.bot_token.expose_secret().starts_with("xoxb-") {
        format!("bot token ready for {}/chat.postMessage", slack.api_base_url)
    } else {
        return Check::fail(NAME, "slack.bot_token must be a bot token (`xoxb-`)");
    };
    let signing = match slack.signing_secret {
        Some(_) => "request signature verification enabled",
        None => "request signature verification disabled (set slack.signing_secret to enable)",
    };

    Check::pass(NAME, format!("verification token present; {delivery}; {signing}"))
}

// Connecting alone is not enough: the event handler needs the migrated table.
fn reply_store(config: &AppConfig) -> Check {
    const NAME: &str = "database_connectivity";
    let database = &config.database;

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return Check::fail(NAME, format!("failed to initialize async runtime: {error}")),
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &database.url,
            database.max_connections,
            database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => return Check::fail(NAME, format!("failed to connect to database: {error}")),
        };

        let counted = SqlUserConfigurationRepository::with_operation_timeout(
            pool.clone(),
            Duration::from_secs(database.timeout_secs),
        )
        .count()
        .await;
        pool.close().await;

        match counted {
            Ok(rows) => Check::pass(
                NAME,
                format!("connected using `{}`; {rows} reply configurations stored", database.url),
            ),
            Err(error) => Check::fail(
                NAME,
                format!(
                    "connected using `{}` but the reply store is not usable ({error}); run `autoreply migrate`",
                    database.url
                ),
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{Check, Report, Verdict};

    #[test]
    fn report_passes_only_when_every_check_passes() {
        let ready = Report::from_checks(vec![Check::pass("a", "fine"), Check::pass("b", "fine")]);
        let blocked = Report::from_checks(vec![Check::pass("a", "fine"), Check::skipped("b")]);

        assert_eq!(ready.overall_status, Verdict::Pass);
        assert_eq!(blocked.overall_status, Verdict::Fail);
    }

    #[test]
    fn human_rendering_marks_each_check() {
        let report = Report::from_checks(vec![
            Check::pass("config_validation", "loaded"),
            Check::fail("database_connectivity", "no such table"),
            Check::skipped("slack_credentials"),
        ]);

        let rendered = report.render_human();

        assert!(rendered.starts_with("doctor: autoreply is not ready"));
        assert!(rendered.contains("- [ok] config_validation: loaded"));
        assert!(rendered.contains("- [fail] database_connectivity: no such table"));
        assert!(rendered.contains("- [skip] slack_credentials: skipped because configuration"));
    }
}
