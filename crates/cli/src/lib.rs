pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "autoreply",
    about = "Autoreply operator CLI",
    long_about = "Operate autoreply migrations, config inspection, readiness checks, and stored reply configurations.",
    after_help = "Examples:\n  autoreply doctor --json\n  autoreply config\n  autoreply reply set --user U024BE7LH --text \"Out until Monday\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack credential readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect or edit a user's stored auto-reply configuration")]
    Reply {
        #[command(subcommand)]
        action: ReplyAction,
    },
}

#[derive(Debug, Subcommand)]
enum ReplyAction {
    #[command(about = "Print the stored reply for a user")]
    Show {
        #[arg(long, help = "Slack user id, e.g. U024BE7LH")]
        user: String,
    },
    #[command(about = "Store or replace the reply for a user")]
    Set {
        #[arg(long, help = "Slack user id, e.g. U024BE7LH")]
        user: String,
        #[arg(long, help = "Reply message sent when someone messages the user")]
        text: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Reply { action: ReplyAction::Show { user } } => commands::reply::show(&user),
        Command::Reply { action: ReplyAction::Set { user, text } } => {
            commands::reply::set(&user, &text)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
