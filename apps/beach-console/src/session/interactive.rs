use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::{Completer, LineEditor, ReadMode, ReadOutcome};
use crate::session::{SessionEngine, SessionError};

/// Settings for the persistent prompt loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub prompt: String,
    pub history: bool,
    pub exit_commands: Vec<String>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            prompt: "> ".to_owned(),
            history: true,
            exit_commands: vec!["exit".to_owned(), "quit".to_owned()],
        }
    }
}

impl LoopSettings {
    pub fn is_exit_command(&self, line: &str) -> bool {
        self.exit_commands.iter().any(|command| command == line)
    }
}

/// Completion hooks handed to the line editor while it reads a command.
///
/// They run while the editor is in the middle of reading, so they never
/// reconnect. A lost connection yields no candidates and the engine
/// reconnects before the next command instead.
pub struct CompletionHooks<'a> {
    engine: &'a mut SessionEngine,
}

impl<'a> CompletionHooks<'a> {
    pub fn new(engine: &'a mut SessionEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Completer for CompletionHooks<'_> {
    async fn on_completion_request(&mut self, buffer: &str) -> Vec<String> {
        match self.engine.try_query_completions(buffer).await {
            Ok(candidates) => candidates,
            Err(SessionError::Disconnected) => {
                debug!(target: "beach_console::completion", "completion skipped, connection lost");
                self.engine.mark_needs_reconnect();
                Vec::new()
            }
            Err(err) => {
                self.engine.defer_error(err);
                Vec::new()
            }
        }
    }

    fn on_display_matches(&mut self, candidates: &[String]) {
        if let Err(err) = self.engine.display_matches(candidates) {
            self.engine.defer_error(err);
        }
    }
}

/// Read commands until an exit command or end of input. A lost connection
/// is reconnected once and the loop prompts again; the interrupted command
/// is not retried.
pub async fn run(
    engine: &mut SessionEngine,
    editor: &mut dyn LineEditor,
    settings: &LoopSettings,
) -> Result<(), SessionError> {
    let mode = ReadMode::COMMAND.with_history(settings.history);
    loop {
        let outcome = {
            let mut hooks = CompletionHooks::new(engine);
            editor
                .read_line(&settings.prompt, mode, Some(&mut hooks as &mut dyn Completer))
                .await
                .map_err(SessionError::Input)?
        };
        if let Some(err) = engine.take_deferred_error() {
            return Err(err);
        }

        let line = match outcome {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => continue,
            ReadOutcome::Eof => return Ok(()),
        };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if settings.is_exit_command(command) {
            debug!(target: "beach_console::session", %command, "exit requested");
            return Ok(());
        }

        if engine.needs_reconnect() {
            eprintln!("reconnecting to {}…", engine.endpoint());
        }
        match engine.execute(&line, editor).await {
            Ok(()) => {}
            Err(SessionError::Disconnected) => {
                warn!(target: "beach_console::session", "connection lost during command");
                eprintln!("connection lost, reconnecting to {}…", engine.endpoint());
                engine.reconnect().await?;
            }
            Err(err) => return Err(err),
        }
    }
}
