use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use connect_four_client::config::AppConfig;
use connect_four_client::logging;
use connect_four_client::ui::App;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "connect_four_client", about = "Play networked Connect Four in the terminal")]
struct Cli {
    /// Path to TOML config file
    #[arg(long, env = "CONFIG_PATH", default_value = "config.toml")]
    config: PathBuf,

    /// Session channel endpoint (overrides server.websocket_url)
    #[arg(long)]
    server: Option<String>,

    /// Account and rankings API base URL (overrides server.api_base_url)
    #[arg(long)]
    api: Option<String>,

    /// Play as this user without logging in
    #[arg(long)]
    username: Option<String>,

    /// Print the default config as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    let (mut config, found) = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(server) = cli.server {
        config.server.websocket_url = server;
    }
    if let Some(api) = cli.api {
        config.server.api_base_url = api;
    }
    config.validate().context("invalid configuration")?;

    let debug_log = logging::init(&config.logging).context("setting up logging")?;
    if !found {
        warn!(path = %cli.config.display(), "config file not found, using defaults");
    }
    info!(
        websocket_url = %config.server.websocket_url,
        api_base_url = %config.server.api_base_url,
        "client starting"
    );

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let mut app = App::new(config, runtime.handle().clone(), debug_log, cli.username)?;

    // The debug log follows capture_path as events arrive; these last
    // records land there even when the terminal fails.
    let result = run_terminal(&mut app);
    match &result {
        Ok(()) => info!("client exiting"),
        Err(e) => error!(error = %e, "terminal error"),
    }
    result.context("terminal error")
}

fn run_terminal(app: &mut App) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal, even on error
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    res
}
