pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use config::ConsoleConfig;
pub use error::CliError;
