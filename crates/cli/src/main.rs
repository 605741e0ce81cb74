use std::process::ExitCode;

fn main() -> ExitCode {
    autoreply_cli::run()
}
