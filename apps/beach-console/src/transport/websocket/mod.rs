use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::io;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{Connector as TlsConnector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::{ConnectError, Connector, Transport, TransportError};

pub mod config;
pub use config::{Credential, WebSocketConfig};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket implementation of the Transport trait
pub struct WebSocketTransport {
    stream: Stream,
    connected: bool,
}

impl WebSocketTransport {
    pub async fn connect(config: &WebSocketConfig) -> Result<Self, ConnectError> {
        let url = config.build_url();
        let unreachable = |reason: String| ConnectError::Unreachable {
            endpoint: url.clone(),
            reason,
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| unreachable(err.to_string()))?;
        if let Some(credential) = &config.credential {
            let value = HeaderValue::from_str(&credential.header_value())
                .map_err(|err| unreachable(format!("invalid credential: {err}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let connector = if config.verify_tls {
            None
        } else {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|err| unreachable(format!("tls setup failed: {err}")))?;
            Some(TlsConnector::NativeTls(tls))
        };

        let (stream, response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
                .await
                .map_err(|err| classify_connect_error(&url, err))?;
        debug!(
            target: "beach_console::transport",
            endpoint = %url,
            status = %response.status(),
            "websocket connected"
        );

        Ok(Self {
            stream,
            connected: true,
        })
    }

    fn lost(&mut self, err: &tungstenite::Error) -> TransportError {
        warn!(target: "beach_console::transport", error = %err, "websocket failure");
        self.connected = false;
        TransportError::Disconnected
    }
}

fn classify_connect_error(endpoint: &str, err: tungstenite::Error) -> ConnectError {
    match err {
        tungstenite::Error::Http(response) => ConnectError::Rejected {
            endpoint: endpoint.to_owned(),
            reason: format!("server answered {}", response.status()),
        },
        tungstenite::Error::HttpFormat(err) => ConnectError::Rejected {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        },
        tungstenite::Error::Protocol(err) => ConnectError::Rejected {
            endpoint: endpoint.to_owned(),
            reason: err.to_string(),
        },
        other => ConnectError::Unreachable {
            endpoint: endpoint.to_owned(),
            reason: other.to_string(),
        },
    }
}

fn is_interrupted(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::Io(io) if matches!(io.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
    )
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        let message = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::Text(text),
            Err(err) => Message::Binary(err.into_bytes()),
        };
        trace!(target: "beach_console::transport", bytes = data.len(), "send frame");
        match self.stream.send(message).await {
            Ok(()) => Ok(()),
            // The frame is already buffered; only the flush was interrupted.
            Err(err) if is_interrupted(&err) => loop {
                match self.stream.flush().await {
                    Ok(()) => break Ok(()),
                    Err(err) if is_interrupted(&err) => continue,
                    Err(err) => break Err(self.lost(&err)),
                }
            },
            Err(err) => Err(self.lost(&err)),
        }
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        loop {
            match self.stream.next().await {
                None => {
                    self.connected = false;
                    return Ok(None);
                }
                Some(Ok(Message::Text(text))) => return Ok(Some(text.into_bytes())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(target: "beach_console::transport", ?frame, "server closed websocket");
                    self.connected = false;
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) if is_interrupted(&err) => continue,
                Some(Err(err)) => return Err(self.lost(&err)),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        if self.connected {
            self.connected = false;
            let _ = self.stream.close(None).await;
        }
    }
}

/// Opens a fresh [`WebSocketTransport`] for every connect or reconnect.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ConnectError> {
        let transport = WebSocketTransport::connect(&self.config).await?;
        Ok(Box::new(transport))
    }

    fn endpoint(&self) -> String {
        self.config.build_url()
    }
}
