use std::io;
use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::transport::{ConnectError, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("option handshake failed: {0}")]
    Handshake(TransportError),
    #[error("connection to the command server was lost")]
    Disconnected,
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("completion query failed after reconnecting")]
    CompletionUnavailable,
    #[error("terminal output failed: {0}")]
    Output(#[from] io::Error),
    #[error("reading input failed: {0}")]
    Input(io::Error),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Disconnected => SessionError::Disconnected,
        }
    }
}

impl SessionError {
    /// Whether a reconnect can recover the session.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionError::Disconnected)
    }
}
