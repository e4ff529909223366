use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use foxtool::app::{self, AppOptions, DEFAULT_TARGET, DEFAULT_WINDOW_TITLE};
use foxtool::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "foxtool")]
#[command(about = "Hotkey-driven autoclicker and key holder with a heads-up overlay")]
#[command(version)]
struct Cli {
    /// Hotkey binding file; created with defaults when missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Substring of the game's executable path or command line
    #[arg(long, default_value = DEFAULT_TARGET)]
    target: String,

    /// Exact window title that also identifies the game (repeatable)
    #[arg(long = "window-title", default_value = DEFAULT_WINDOW_TITLE)]
    window_titles: Vec<String>,

    /// Run without the HUD overlay
    #[arg(long)]
    no_overlay: bool,

    /// Enable debug logging (RUST_LOG is honoured in this mode)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let options = AppOptions {
        config_path: cli.config,
        target: cli.target,
        window_titles: cli.window_titles,
        overlay: !cli.no_overlay,
    };
    app::run(&options).context("foxtool could not start")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => {
            println!("Bye.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
