use std::io::{self, IsTerminal};
use tracing::{debug, info};

use crate::client::StdinEditor;
use crate::session::{self, ResizeWatcher, SessionEngine};
use crate::terminal::config::ConsoleConfig;
use crate::terminal::error::CliError;
use crate::transport::WebSocketConnector;

pub async fn run(config: ConsoleConfig) -> Result<(), CliError> {
    let one_shot = config.is_one_shot();
    let redraw = !one_shot && io::stdout().is_terminal();
    let resize = if one_shot {
        ResizeWatcher::new(session::resize::terminal_width)
    } else {
        ResizeWatcher::for_terminal()
    };
    debug!(one_shot, redraw, endpoint = %config.websocket.build_url(), "starting console");

    let connector = WebSocketConnector::new(config.websocket.clone());
    let mut engine = SessionEngine::new(Box::new(connector), config.options.clone())
        .with_output(Box::new(io::stdout()), redraw)
        .with_resize_watcher(resize);
    engine.connect().await?;

    let mut editor = StdinEditor::new();
    let result = if one_shot {
        engine.execute_args(&config.command, &mut editor).await
    } else {
        session::interactive::run(&mut engine, &mut editor, &config.loop_settings).await
    };
    engine.close().await;
    info!(ok = result.is_ok(), "console finished");
    result.map_err(CliError::from)
}
