use beach_console::telemetry::logging as logctl;
use beach_console::terminal::error::EXIT_OK;
use beach_console::terminal::{CliError, ConsoleConfig, app, cli};
use tracing::debug;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            eprintln!("❌ {err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<(), CliError> {
    let config = ConsoleConfig::from_cli(cli::parse())?;
    logctl::init(&config.logging).map_err(|err| CliError::Logging(err.to_string()))?;
    debug!(log_level = ?config.logging.level, log_file = ?config.logging.file, "logging configured");
    app::run(config).await
}
