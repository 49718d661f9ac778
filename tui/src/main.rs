//! streamchat TUI Entry Point
//!
//! Usage:
//!   streamchat-tui [OPTIONS]
//!
//! Configuration is read from `~/.config/streamchat/config.toml`, then
//! `STREAMCHAT_*` environment variables, then the flags below.

use std::fs::File;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use streamchat_core::{default_config_path, load_config_from_path, ChatConfig, ConfigOverrides};
use streamchat_tui::App;

/// Streaming chat client for OpenAI-compatible endpoints
#[derive(Parser, Debug)]
#[command(name = "streamchat-tui")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "STREAMCHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chat completions endpoint URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Model to start with
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Scenario to start with
    #[arg(short = 's', long, value_name = "NAME")]
    scenario: Option<String>,

    /// Directory for daily markdown chat logs
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Start with continuation mode off
    #[arg(long)]
    no_continuation: bool,

    /// Write diagnostics to this file (nothing is logged otherwise)
    #[arg(long, env = "STREAMCHAT_LOG_FILE", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STREAMCHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(endpoint) = &self.endpoint {
            overrides = overrides.with_endpoint(endpoint.clone());
        }
        if let Some(model) = &self.model {
            overrides = overrides.with_model(model.clone());
        }
        if let Some(scenario) = &self.scenario {
            overrides = overrides.with_scenario(scenario.clone());
        }
        if let Some(dir) = &self.log_dir {
            overrides = overrides.with_log_dir(dir.clone());
        }
        if self.no_continuation {
            overrides = overrides.with_continuation(false);
        }
        overrides
    }
}

/// Log to a file only; the terminal belongs to the UI
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };

    let level = &args.log_level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("streamchat_tui={level},streamchat_core={level}"))
    });
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();

    Ok(())
}

fn load(args: &Args) -> anyhow::Result<ChatConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        source = %config.source(),
        endpoint = %config.endpoint,
        model = %config.model,
        scenario = %config.scenario,
        "Configuration loaded"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = load(&args)?;

    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: streamchat-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("Run it interactively, or with `ssh -t` when remote.");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    match result {
        Ok(Some(goodbye)) => {
            println!("\n{goodbye}\n");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: ChatConfig,
) -> anyhow::Result<Option<String>> {
    let mut app = App::new(config)?;
    app.run(terminal).await?;
    Ok(app.goodbye().map(str::to_string))
}
