use std::sync::Arc;

use anyhow::Result;
use gemchat_core::{ChatBackend, Config, GeminiClient};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing(&logging::LogConfig::from_env()?)?;

    let config = Config::load()?;
    let api_key = config.resolve_api_key()?;
    let model = config.resolve_model();
    let settings = config.session_settings();

    // One client for the whole process, shared by every request
    let backend: Arc<dyn ChatBackend> =
        Arc::new(GeminiClient::with_base_url(&api_key, &model, config.base_url()));

    tracing::info!(
        model = %model,
        concurrency = settings.concurrency.as_str(),
        max_output_tokens = settings.max_output_tokens,
        timeout = ?config.request_timeout(),
        "Starting gemchat"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(backend, settings, config.request_timeout(), events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "gemchat exited with an error");
    }
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| {
            app.viewport = frame.area();
            ui::render(app, frame);
        })?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
