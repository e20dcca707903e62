use clap::{Args, Parser};
use std::path::PathBuf;

use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "beach-console",
    about = "🏖️  Run commands on a remote command server",
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("BUILD_TIMESTAMP"))
)]
pub struct Cli {
    #[arg(
        value_name = "URL",
        env = "BEACH_CONSOLE_URL",
        help = "WebSocket endpoint of the command server (ws://, wss:// or host[:port]/path)"
    )]
    pub url: String,

    #[arg(
        long = "auth",
        value_name = "USER:PASSWORD",
        env = "BEACH_CONSOLE_AUTH",
        hide_env_values = true,
        help = "Basic-auth credential sent with the connection request"
    )]
    pub auth: Option<String>,

    #[arg(
        long = "insecure",
        action = clap::ArgAction::SetTrue,
        help = "Skip TLS certificate and hostname verification"
    )]
    pub insecure: bool,

    #[arg(
        long = "prompt",
        env = "BEACH_CONSOLE_PROMPT",
        default_value = "> ",
        help = "Prompt shown in interactive mode"
    )]
    pub prompt: String,

    #[arg(
        long = "no-history",
        action = clap::ArgAction::SetTrue,
        help = "Do not record entered commands in the session history"
    )]
    pub no_history: bool,

    #[arg(
        long = "exit-command",
        value_name = "WORD",
        action = clap::ArgAction::Append,
        help = "Input that ends the interactive session (repeatable; defaults to exit and quit)"
    )]
    pub exit_commands: Vec<String>,

    #[arg(
        long = "options",
        value_name = "JSON",
        env = "BEACH_CONSOLE_OPTIONS",
        help = "JSON object of extra session options sent during the handshake"
    )]
    pub options: Option<String>,

    #[arg(
        long = "no-upload",
        action = clap::ArgAction::SetTrue,
        help = "Refuse server requests for local file contents"
    )]
    pub no_upload: bool,

    #[arg(
        long = "debug",
        action = clap::ArgAction::SetTrue,
        help = "Enable server-side debug output and log every frame"
    )]
    pub debug: bool,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[arg(
        trailing_var_arg = true,
        value_name = "COMMAND",
        help = "Run this command once and exit instead of starting the interactive prompt"
    )]
    pub command: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "BEACH_CONSOLE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "BEACH_CONSOLE_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
