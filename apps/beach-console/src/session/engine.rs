use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

use crate::client::{
    CompletionCache, LineEditor, ReadMode, ReadOutcome, RenderStep, ResponseRenderer,
    SpecialRequest,
};
use crate::protocol::{self, Decoded, Verb};
use crate::session::SessionError;
use crate::session::options::{self, SessionOptions};
use crate::session::resize::ResizeWatcher;
use crate::telemetry::logging::hexdump;
use crate::transport::{Connector, Transport, TransportError};

/// OS error code reported when uploads are switched off locally.
const UPLOAD_DISABLED_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    File,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Disconnected,
    Handshaking,
    Idle,
    AwaitingResponse,
    AwaitingSpecial(SpecialKind),
}

pub type Output = Box<dyn Write + Send>;

/// Drives the request/response protocol over one connection at a time.
pub struct SessionEngine {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    options: SessionOptions,
    renderer: ResponseRenderer<Output>,
    completions: CompletionCache,
    resize: ResizeWatcher,
    state: EngineState,
    needs_reconnect: bool,
    deferred: Option<SessionError>,
}

impl SessionEngine {
    pub fn new(connector: Box<dyn Connector>, options: SessionOptions) -> Self {
        Self {
            connector,
            transport: None,
            options,
            renderer: ResponseRenderer::new(Box::new(io::stdout()), false),
            completions: CompletionCache::new(),
            resize: ResizeWatcher::default(),
            state: EngineState::Disconnected,
            needs_reconnect: false,
            deferred: None,
        }
    }

    /// Replace the output sink. `redraw` enables in-place line updates and
    /// should only be set for an interactive terminal.
    pub fn with_output(mut self, out: Output, redraw: bool) -> Self {
        self.renderer = ResponseRenderer::new(out, redraw);
        self
    }

    pub fn with_resize_watcher(mut self, resize: ResizeWatcher) -> Self {
        self.resize = resize;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn completions(&self) -> &CompletionCache {
        &self.completions
    }

    pub fn needs_reconnect(&self) -> bool {
        self.needs_reconnect || self.transport.is_none()
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    /// Open a connection and run the OPTION handshake.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        self.discard_connection();
        let transport = self.connector.connect().await?;
        self.transport = Some(transport);
        self.state = EngineState::Handshaking;
        info!(target: "beach_console::session", endpoint = %self.connector.endpoint(), "connected");

        if let Err(err) = self.handshake().await {
            self.discard_connection();
            return Err(match err {
                SessionError::Disconnected => SessionError::Handshake(TransportError::Disconnected),
                other => other,
            });
        }
        self.needs_reconnect = false;
        self.state = EngineState::Idle;
        Ok(())
    }

    /// Drop the current connection and connect again with a full OPTION
    /// replay. Exactly one attempt is made.
    pub async fn reconnect(&mut self) -> Result<(), SessionError> {
        if let Some(width) = self.resize.current_width() {
            self.options.set_width(width);
        }
        // The replayed handshake carries the latest width already.
        self.resize.take_pending();
        info!(target: "beach_console::session", "reconnecting");
        self.connect().await
    }

    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.state = EngineState::Disconnected;
    }

    async fn handshake(&mut self) -> Result<(), SessionError> {
        for (name, value) in self.options.entries() {
            self.option_exchange(&name, &value).await?;
        }
        self.renderer.reset();
        debug!(target: "beach_console::session", "handshake complete");
        Ok(())
    }

    async fn option_exchange(&mut self, name: &str, value: &str) -> Result<(), SessionError> {
        self.send(Verb::Option, &options::payload(name, value)).await?;
        if let Some(special) = self.drain_cycle().await? {
            warn!(target: "beach_console::session", option = %name, ?special, "ignoring special request in option response");
        }
        Ok(())
    }

    /// Push the terminal width if a resize happened since the last check.
    pub async fn push_width_if_resized(&mut self) -> Result<bool, SessionError> {
        if !self.resize.take_pending() {
            return Ok(false);
        }
        let width = self
            .resize
            .current_width()
            .unwrap_or_else(|| self.options.width());
        self.options.set_width(width);
        debug!(target: "beach_console::session", width, "pushing resized width");
        self.option_exchange(options::WIDTH, &width.to_string()).await?;
        Ok(true)
    }

    /// Run one command and render its response, answering any file or
    /// prompt requests along the way.
    pub async fn execute(
        &mut self,
        line: &str,
        editor: &mut dyn LineEditor,
    ) -> Result<(), SessionError> {
        if self.needs_reconnect() {
            self.reconnect().await?;
        }
        self.push_width_if_resized().await?;
        self.completions.invalidate();

        self.state = EngineState::AwaitingResponse;
        let result = self.run_exchange(line, editor).await;
        self.renderer.reset();
        if self.transport.is_some() {
            self.state = EngineState::Idle;
        }
        result
    }

    /// One-shot form: the arguments are joined with single spaces.
    pub async fn execute_args(
        &mut self,
        args: &[String],
        editor: &mut dyn LineEditor,
    ) -> Result<(), SessionError> {
        self.execute(&args.join(" "), editor).await
    }

    async fn run_exchange(
        &mut self,
        line: &str,
        editor: &mut dyn LineEditor,
    ) -> Result<(), SessionError> {
        self.send(Verb::Exec, line).await?;
        loop {
            match self.drain_cycle().await? {
                None => return Ok(()),
                Some(SpecialRequest::File(path)) => {
                    self.state = EngineState::AwaitingSpecial(SpecialKind::File);
                    self.answer_file(&path).await?;
                }
                Some(SpecialRequest::Prompt(prompt)) => {
                    self.state = EngineState::AwaitingSpecial(SpecialKind::Prompt);
                    self.answer_prompt(&prompt, editor).await?;
                    // The prompt and the echoed answer share one terminal row.
                    self.renderer.advance_rows(1);
                }
            }
            self.state = EngineState::AwaitingResponse;
        }
    }

    async fn answer_file(&mut self, path: &str) -> Result<(), SessionError> {
        if !self.options.upload() {
            warn!(target: "beach_console::session", %path, "file requested but uploads are disabled");
            let payload = format!("{UPLOAD_DISABLED_CODE} file upload disabled");
            return self.send(Verb::Error, &payload).await;
        }
        match tokio::fs::read(Path::new(path)).await {
            Ok(contents) => {
                debug!(target: "beach_console::session", %path, bytes = contents.len(), "uploading file");
                self.send(Verb::File, &STANDARD.encode(contents)).await
            }
            Err(err) => {
                warn!(target: "beach_console::session", %path, error = %err, "file request failed");
                let code = err.raw_os_error().unwrap_or(-1);
                self.send(Verb::Error, &format!("{code} {err}")).await
            }
        }
    }

    async fn answer_prompt(
        &mut self,
        prompt: &str,
        editor: &mut dyn LineEditor,
    ) -> Result<(), SessionError> {
        let reply = loop {
            match editor
                .read_line(prompt, ReadMode::PROMPT, None)
                .await
                .map_err(SessionError::Input)?
            {
                ReadOutcome::Line(line) => break line,
                ReadOutcome::Interrupted => {
                    trace!(target: "beach_console::session", "prompt interrupted, asking again");
                    continue;
                }
                // Asking a closed input again would never end.
                ReadOutcome::Eof => break String::new(),
            }
        };
        self.push_width_if_resized().await?;
        self.send(Verb::Reply, &reply).await
    }

    /// Candidates for `buffer`. A lost connection is retried once after a
    /// reconnect; a second failure ends the session.
    pub async fn query_completions(&mut self, buffer: &str) -> Result<Vec<String>, SessionError> {
        match self.try_query_completions(buffer).await {
            Err(SessionError::Disconnected) => {
                self.reconnect().await?;
                match self.try_query_completions(buffer).await {
                    Err(SessionError::Disconnected) => Err(SessionError::CompletionUnavailable),
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Candidates for `buffer` without ever reconnecting. Served from the
    /// cache while the buffer is unchanged.
    pub async fn try_query_completions(
        &mut self,
        buffer: &str,
    ) -> Result<Vec<String>, SessionError> {
        if let Some(cached) = self.completions.lookup(buffer) {
            trace!(target: "beach_console::completion", %buffer, "cache hit");
            return Ok(cached.to_vec());
        }
        self.completions.invalidate();
        if self.transport.is_none() {
            return Err(SessionError::Disconnected);
        }

        self.send(Verb::Comp, buffer).await?;
        let mut lines = Vec::new();
        loop {
            match self.recv_decoded().await? {
                Decoded::EndOfResponse => break,
                Decoded::Frame(frame) if frame.kind().is_special() => {
                    warn!(target: "beach_console::completion", key = %frame.key, "ignoring special request in completion response");
                }
                Decoded::Frame(frame) => lines.push(frame.text),
            }
        }
        Ok(self.completions.populate(buffer, lines.into_iter()).to_vec())
    }

    /// Print candidate matches below the current input line.
    pub fn display_matches(&mut self, candidates: &[String]) -> Result<(), SessionError> {
        let out = self.renderer.get_mut();
        out.write_all(b"\r\n")?;
        out.write_all(candidates.join("  ").as_bytes())?;
        out.write_all(b"\r\n")?;
        out.flush()?;
        Ok(())
    }

    pub(crate) fn mark_needs_reconnect(&mut self) {
        self.needs_reconnect = true;
    }

    /// Remember a fatal error raised where it could not be returned.
    pub(crate) fn defer_error(&mut self, err: SessionError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }

    pub fn take_deferred_error(&mut self) -> Option<SessionError> {
        self.deferred.take()
    }

    async fn drain_cycle(&mut self) -> Result<Option<SpecialRequest>, SessionError> {
        loop {
            let decoded = self.recv_decoded().await?;
            if let RenderStep::Finished(special) = self.renderer.consume(decoded)? {
                return Ok(special);
            }
        }
    }

    async fn send(&mut self, verb: Verb, payload: &str) -> Result<(), SessionError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(SessionError::Disconnected);
        };
        if self.options.debug() {
            debug!(target: "beach_console::wire", %verb, payload_len = payload.len(), "-> frame");
        }
        let frame = protocol::encode(verb, payload);
        if let Err(err) = transport.send(&frame).await {
            self.lose_connection();
            return Err(err.into());
        }
        Ok(())
    }

    async fn recv_decoded(&mut self) -> Result<Decoded, SessionError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(SessionError::Disconnected);
        };
        let bytes = match transport.recv().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) | Err(TransportError::Disconnected) => {
                self.lose_connection();
                return Err(SessionError::Disconnected);
            }
        };
        match protocol::decode(&bytes) {
            Ok(decoded) => {
                if self.options.debug() {
                    trace!(target: "beach_console::wire", ?decoded, "<- frame");
                }
                Ok(decoded)
            }
            Err(err) => {
                warn!(
                    target: "beach_console::wire",
                    error = %err,
                    "malformed frame\n{}",
                    hexdump(&bytes)
                );
                // The stream is out of step; nothing more may be sent on it.
                self.discard_connection();
                Err(err.into())
            }
        }
    }

    fn lose_connection(&mut self) {
        if self.transport.take().is_some() {
            warn!(target: "beach_console::session", "connection lost");
        }
        self.renderer.reset();
        self.completions.invalidate();
        self.state = EngineState::Disconnected;
    }

    fn discard_connection(&mut self) {
        self.transport = None;
        self.renderer.reset();
        self.completions.invalidate();
        self.state = EngineState::Disconnected;
    }
}
