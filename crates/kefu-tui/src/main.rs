use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};

use kefu_core::{Config, Provider};

mod app;
mod handler;
mod input;
mod logger;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "kefu")]
#[command(version, about = "Customer-service chat console with AI-drafted customer replies")]
struct Cli {
    /// Reply provider: gemini, ollama, claude, openai or echo
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name for the chosen provider
    #[arg(short, long)]
    model: Option<String>,

    /// Log filter, e.g. "info" or "kefu_core=debug". RUST_LOG takes precedence.
    #[arg(long)]
    log_level: Option<String>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let provider_override = cli
        .provider
        .as_deref()
        .map(|name| Provider::from_str(name).ok_or_else(|| anyhow!("unknown provider '{name}'")))
        .transpose()?;

    // A broken config file should not keep the console from starting
    let config_path = Config::get_config_path().ok();
    let config = match &config_path {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            eprintln!("warning: ignoring config at {}: {e}", path.display());
            Config::new()
        }),
        None => Config::new(),
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    if let Some(log_file) = cli.log_file.clone().or_else(logger::default_log_path) {
        if let Err(e) = logger::init(&level, &log_file) {
            eprintln!("warning: logging disabled: {e:#}");
        }
    }

    let mut app = App::new(config, config_path, provider_override, cli.model);
    info!(
        provider = app.current_provider.as_str(),
        model = %app.selected_model,
        "starting"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        warn!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
        app.poll_replies().await;
    }

    Ok(())
}
