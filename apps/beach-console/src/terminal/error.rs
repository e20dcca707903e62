use crate::session::SessionError;
use crate::session::options::OptionsError;
use crate::transport::ConnectError;
use std::io;
use thiserror::Error;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONNECT: i32 = 2;
pub const EXIT_HANDSHAKE: i32 = 3;
pub const EXIT_PROTOCOL: i32 = 4;
pub const EXIT_DISCONNECTED: i32 = 5;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Options(#[from] OptionsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Session(SessionError::Connect(ConnectError::Unreachable { .. })) => {
                EXIT_CONNECT
            }
            CliError::Session(SessionError::Connect(ConnectError::Rejected { .. }))
            | CliError::Session(SessionError::Handshake(_)) => EXIT_HANDSHAKE,
            CliError::Session(SessionError::Protocol(_)) => EXIT_PROTOCOL,
            CliError::Session(SessionError::Disconnected)
            | CliError::Session(SessionError::CompletionUnavailable) => EXIT_DISCONNECTED,
            CliError::Session(SessionError::Output(_) | SessionError::Input(_))
            | CliError::Options(_)
            | CliError::Io(_)
            | CliError::Logging(_)
            | CliError::InvalidArgument(_) => EXIT_FAILURE,
        }
    }
}
