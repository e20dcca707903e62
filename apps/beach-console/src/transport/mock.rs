use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{ConnectError, Connector, Transport, TransportError};

#[derive(Debug, Clone)]
enum Step {
    Respond(Vec<Vec<u8>>),
    DropOnSend,
    DropOnRecv,
}

#[derive(Debug, Default)]
struct ServerState {
    steps: VecDeque<Step>,
    sent: Vec<String>,
    connect_failures: VecDeque<ConnectError>,
    connections: usize,
    scripted_options: bool,
}

/// In-memory command server driven by a script.
///
/// Every non-OPTION frame the client sends consumes the next scripted step.
/// OPTION frames are answered with an empty response automatically unless
/// [`ScriptedServer::script_options`] is enabled. When nothing is queued the
/// connection behaves as if the peer went away.
#[derive(Debug, Clone, Default)]
pub struct ScriptedServer {
    state: Arc<Mutex<ServerState>>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the frames answering the next request. `""` is the end-of-response frame.
    pub fn respond(&self, frames: &[&str]) -> &Self {
        let frames = frames.iter().map(|frame| frame.as_bytes().to_vec()).collect();
        self.push(Step::Respond(frames))
    }

    pub fn respond_raw(&self, frames: Vec<Vec<u8>>) -> &Self {
        self.push(Step::Respond(frames))
    }

    /// The next request fails to send.
    pub fn drop_on_send(&self) -> &Self {
        self.push(Step::DropOnSend)
    }

    /// The next request is accepted but the connection dies before any reply.
    pub fn drop_on_recv(&self) -> &Self {
        self.push(Step::DropOnRecv)
    }

    pub fn fail_next_connect(&self, error: ConnectError) -> &Self {
        self.lock().connect_failures.push_back(error);
        self
    }

    /// Make OPTION frames consume scripted steps like any other request.
    pub fn script_options(&self, enabled: bool) -> &Self {
        self.lock().scripted_options = enabled;
        self
    }

    /// Every frame the client has sent, across all connections.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    pub fn sent_with_verb(&self, verb: &str) -> Vec<String> {
        let prefix = format!("{verb} ");
        self.sent()
            .into_iter()
            .filter(|frame| frame.starts_with(&prefix))
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    pub fn pending_steps(&self) -> usize {
        self.lock().steps.len()
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            server: self.clone(),
        }
    }

    fn push(&self, step: Step) -> &Self {
        self.lock().steps.push_back(step);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One client connection to a [`ScriptedServer`].
#[derive(Debug)]
pub struct MockTransport {
    server: ScriptedServer,
    inbox: VecDeque<Vec<u8>>,
    connected: bool,
    drop_pending: bool,
}

impl MockTransport {
    pub fn new(server: ScriptedServer) -> Self {
        Self {
            server,
            inbox: VecDeque::new(),
            connected: true,
            drop_pending: false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        let frame = String::from_utf8_lossy(data).into_owned();
        let mut state = self.server.lock();
        let is_option = frame.starts_with("OPTION ");
        if is_option && !state.scripted_options {
            state.sent.push(frame);
            self.inbox.push_back(Vec::new());
            return Ok(());
        }
        match state.steps.pop_front() {
            Some(Step::Respond(frames)) => {
                state.sent.push(frame);
                self.inbox.extend(frames);
            }
            Some(Step::DropOnRecv) => {
                state.sent.push(frame);
                self.drop_pending = true;
            }
            Some(Step::DropOnSend) => {
                self.connected = false;
                return Err(TransportError::Disconnected);
            }
            None => {
                state.sent.push(frame);
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        match self.inbox.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.connected = false;
                self.drop_pending = false;
                Err(TransportError::Disconnected)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.drop_pending
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

#[derive(Debug, Clone)]
pub struct MockConnector {
    server: ScriptedServer,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ConnectError> {
        let mut state = self.server.lock();
        if let Some(error) = state.connect_failures.pop_front() {
            return Err(error);
        }
        state.connections += 1;
        drop(state);
        Ok(Box::new(MockTransport::new(self.server.clone())))
    }

    fn endpoint(&self) -> String {
        "mock://scripted".to_owned()
    }
}
