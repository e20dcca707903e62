use std::collections::BTreeMap;

use crate::session::LoopSettings;
use crate::session::options::{self, DEFAULT_WIDTH, SessionOptions};
use crate::session::resize::terminal_width;
use crate::telemetry::logging::LogConfig;
use crate::terminal::cli::Cli;
use crate::terminal::error::CliError;
use crate::transport::websocket::{Credential, WebSocketConfig};

/// Validated startup bundle built from the command line.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub websocket: WebSocketConfig,
    pub options: SessionOptions,
    pub loop_settings: LoopSettings,
    pub logging: LogConfig,
    /// Non-empty for one-shot invocations.
    pub command: Vec<String>,
}

impl ConsoleConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, CliError> {
        Self::from_cli_with_width(cli, terminal_width())
    }

    pub fn from_cli_with_width(cli: Cli, width: Option<u16>) -> Result<Self, CliError> {
        if cli.url.trim().is_empty() {
            return Err(CliError::InvalidArgument("server URL must not be empty".into()));
        }

        let credential = match cli.auth.as_deref() {
            Some(raw) if raw.is_empty() => {
                return Err(CliError::InvalidArgument("--auth must not be empty".into()));
            }
            Some(raw) => Some(Credential::parse(raw)),
            None => None,
        };
        let websocket = WebSocketConfig::new(cli.url.trim())
            .with_credential(credential)
            .with_verify_tls(!cli.insecure)
            .split_userinfo();

        let extra = match cli.options.as_deref() {
            Some(json) => options::parse_extra(json)?,
            None => BTreeMap::new(),
        };
        let options = SessionOptions::new(width.unwrap_or(DEFAULT_WIDTH))
            .with_upload(!cli.no_upload)
            .with_debug(cli.debug)
            .with_extra(extra);

        let mut loop_settings = LoopSettings {
            prompt: cli.prompt,
            history: !cli.no_history,
            ..LoopSettings::default()
        };
        if !cli.exit_commands.is_empty() {
            loop_settings.exit_commands = cli.exit_commands;
        }

        Ok(Self {
            websocket,
            options,
            loop_settings,
            logging: cli.logging.to_config().with_debug(cli.debug),
            command: cli.command,
        })
    }

    pub fn is_one_shot(&self) -> bool {
        !self.command.is_empty()
    }
}
