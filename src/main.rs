mod app;
mod clipboard;
mod components;
mod config;
mod error;
mod event;
mod handler;
mod remote;
mod tree;
mod tui;
mod ui;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{AppConfig, GeneralConfig, ServerConfig};
use crate::event::{Event, EventHandler};
use crate::remote::{HttpTreeService, MemoryTreeService, TreeService};
use crate::tree::store::TreeStore;
use crate::tui::{install_panic_hook, Tui};

/// Terminal client for a remote file/folder tree.
#[derive(Parser, Debug)]
#[command(name = "drive", version, about)]
struct Cli {
    /// Path to a config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the tree service
    #[arg(long)]
    server: Option<String>,

    /// Bearer token for the tree service
    #[arg(long, env = "DRIVE_TOKEN")]
    token: Option<String>,

    /// Work against an in-memory demo tree instead of a server
    #[arg(long)]
    offline: bool,

    /// Disable mouse capture (drag and drop then only works through paste)
    #[arg(long)]
    no_mouse: bool,

    /// Start in the trash view
    #[arg(long)]
    trash: bool,
}

impl Cli {
    /// CLI flags as a partial config that overrides every file source.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: self.server.clone(),
                token: self.token.clone(),
                timeout_ms: None,
            },
            general: GeneralConfig {
                mouse: self.no_mouse.then_some(false),
                confirm_delete: None,
                show_trash: self.trash.then_some(true),
            },
            ..Default::default()
        }
    }
}

/// Send `tracing` output to the log file; the terminal belongs to the UI.
fn init_logging(config: &AppConfig) -> error::Result<()> {
    let path = config.log_file();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

fn build_service(cli: &Cli, config: &AppConfig) -> error::Result<Arc<dyn TreeService>> {
    if cli.offline {
        tracing::info!("using in-memory demo tree");
        return Ok(Arc::new(MemoryTreeService::demo()));
    }
    tracing::info!(base_url = config.base_url(), "connecting to tree service");
    let service = HttpTreeService::new(
        config.base_url(),
        config.token().map(str::to_string),
        config.timeout(),
    )?;
    Ok(Arc::new(service))
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    init_logging(&config)?;
    tracing::info!("starting drive v{}", env!("CARGO_PKG_VERSION"));

    let store = TreeStore::new(build_service(&cli, &config)?);

    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(50));
    let mut app = App::new(store, &config, events.sender());
    app.reload();

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Paste(text) => handler::handle_paste(&mut app, &text),
            Event::Tick => app.on_tick(Instant::now()),
            Event::Resize(_, _) => {}
            Event::OperationComplete(result) => app.handle_operation_complete(result),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("shutting down");
    Ok(())
}
