#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beach_console::client::{Completer, LineEditor, ReadMode, ReadOutcome};
use beach_console::session::{ResizeWatcher, SessionEngine, SessionOptions};
use beach_console::transport::ScriptedServer;

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("test timed out")
}

#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).expect("utf8 output")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub enum EditorStep {
    Read(ReadOutcome),
    /// Ask the completer for candidates, then continue with the next step.
    Complete(String),
    /// Ask the completer to display these matches.
    Display(Vec<String>),
}

/// Line editor fed from a script. Runs out as end-of-input.
#[derive(Default)]
pub struct ScriptedEditor {
    steps: VecDeque<EditorStep>,
    pub calls: Vec<(String, ReadMode)>,
    pub completions: Vec<Vec<String>>,
}

impl ScriptedEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, line: &str) -> Self {
        self.steps
            .push_back(EditorStep::Read(ReadOutcome::Line(line.to_owned())));
        self
    }

    pub fn interrupt(mut self) -> Self {
        self.steps.push_back(EditorStep::Read(ReadOutcome::Interrupted));
        self
    }

    pub fn eof(mut self) -> Self {
        self.steps.push_back(EditorStep::Read(ReadOutcome::Eof));
        self
    }

    pub fn complete(mut self, buffer: &str) -> Self {
        self.steps
            .push_back(EditorStep::Complete(buffer.to_owned()));
        self
    }

    pub fn display(mut self, candidates: &[&str]) -> Self {
        self.steps.push_back(EditorStep::Display(
            candidates.iter().map(|c| (*c).to_owned()).collect(),
        ));
        self
    }

    pub fn prompts(&self) -> Vec<&str> {
        self.calls.iter().map(|(prompt, _)| prompt.as_str()).collect()
    }
}

#[async_trait]
impl LineEditor for ScriptedEditor {
    async fn read_line(
        &mut self,
        prompt: &str,
        mode: ReadMode,
        mut completer: Option<&mut (dyn Completer + '_)>,
    ) -> io::Result<ReadOutcome> {
        self.calls.push((prompt.to_owned(), mode));
        loop {
            match self.steps.pop_front() {
                Some(EditorStep::Read(outcome)) => return Ok(outcome),
                Some(EditorStep::Complete(buffer)) => {
                    let completer = completer
                        .as_deref_mut()
                        .expect("completion requested without a completer");
                    let candidates = completer.on_completion_request(&buffer).await;
                    self.completions.push(candidates);
                }
                Some(EditorStep::Display(candidates)) => {
                    if let Some(completer) = completer.as_deref_mut() {
                        completer.on_display_matches(&candidates);
                    }
                }
                None => return Ok(ReadOutcome::Eof),
            }
        }
    }
}

pub struct Harness {
    pub server: ScriptedServer,
    pub output: SharedBuffer,
    pub engine: SessionEngine,
}

pub fn harness(options: SessionOptions, redraw: bool) -> Harness {
    harness_with_resize(options, redraw, ResizeWatcher::default())
}

pub fn harness_with_resize(
    options: SessionOptions,
    redraw: bool,
    resize: ResizeWatcher,
) -> Harness {
    let server = ScriptedServer::new();
    let output = SharedBuffer::default();
    let engine = SessionEngine::new(Box::new(server.connector()), options)
        .with_output(Box::new(output.clone()), redraw)
        .with_resize_watcher(resize);
    Harness {
        server,
        output,
        engine,
    }
}

pub const HANDSHAKE: [&str; 3] = ["OPTION width=80", "OPTION upload=1", "OPTION debug=0"];
