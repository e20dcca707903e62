use async_trait::async_trait;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Hooks the line editor calls back into while the user is typing.
#[async_trait]
pub trait Completer: Send {
    /// Full candidates for the current buffer.
    async fn on_completion_request(&mut self, buffer: &str) -> Vec<String>;

    /// Called when the editor wants to list several matches.
    fn on_display_matches(&mut self, candidates: &[String]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMode {
    pub completion: bool,
    pub record_history: bool,
}

impl ReadMode {
    /// Regular command entry.
    pub const COMMAND: ReadMode = ReadMode {
        completion: true,
        record_history: true,
    };

    /// Answering a server prompt: no completion, nothing recorded.
    pub const PROMPT: ReadMode = ReadMode {
        completion: false,
        record_history: false,
    };

    pub fn with_history(self, record_history: bool) -> Self {
        Self {
            record_history: self.record_history && record_history,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

#[async_trait]
pub trait LineEditor: Send {
    async fn read_line(
        &mut self,
        prompt: &str,
        mode: ReadMode,
        completer: Option<&mut (dyn Completer + '_)>,
    ) -> io::Result<ReadOutcome>;

    fn history(&self) -> &[String] {
        &[]
    }
}

/// Line-oriented editor over stdin. Ctrl-C while waiting yields
/// [`ReadOutcome::Interrupted`]. Offers no completion UI.
pub struct StdinEditor {
    lines: Lines<BufReader<Stdin>>,
    history: Vec<String>,
}

impl StdinEditor {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            history: Vec::new(),
        }
    }
}

impl Default for StdinEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineEditor for StdinEditor {
    async fn read_line(
        &mut self,
        prompt: &str,
        mode: ReadMode,
        _completer: Option<&mut (dyn Completer + '_)>,
    ) -> io::Result<ReadOutcome> {
        {
            let mut stdout = io::stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }

        let outcome = tokio::select! {
            line = self.lines.next_line() => match line? {
                Some(line) => ReadOutcome::Line(line.trim_end_matches('\r').to_owned()),
                None => ReadOutcome::Eof,
            },
            _ = tokio::signal::ctrl_c() => ReadOutcome::Interrupted,
        };

        if let ReadOutcome::Line(line) = &outcome {
            if mode.record_history && !line.trim().is_empty() {
                self.history.push(line.clone());
            }
        }
        Ok(outcome)
    }

    fn history(&self) -> &[String] {
        &self.history
    }
}
