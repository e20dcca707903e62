use async_trait::async_trait;

pub mod mock;
pub mod websocket;

pub use mock::{MockConnector, MockTransport, ScriptedServer};
pub use websocket::{WebSocketConnector, WebSocketTransport};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection to the command server was lost")]
    Disconnected,
}

/// Coarse reason a connection could not be established.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("unable to reach {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },
    #[error("{endpoint} rejected the connection: {reason}")]
    Rejected { endpoint: String, reason: String },
}

/// Duplex, message-oriented connection to the command server.
///
/// Each `send` carries exactly one frame and each successful `recv` yields
/// exactly one frame. `Ok(None)` from `recv` means the peer closed the stream.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    fn is_connected(&self) -> bool;

    async fn close(&mut self) {}
}

/// Factory for fresh transports. Used for the first connection and for
/// every reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>, ConnectError>;

    fn endpoint(&self) -> String;
}
