use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use shotpath::app::{self, AppContext, StartOptions};
use shotpath::clipboard;
use shotpath::hotkey::{Combination, validate_primary};
use shotpath::logging;
use shotpath::storage::{JsonConfigStorage, default_config_path, ensure_directories};
use shotpath::ui::ConsoleNotifier;

#[derive(Parser)]
#[command(name = "shotpath")]
#[command(
    about = "Save clipboard screenshots as PNG files and paste their path with a hotkey",
    long_about = None
)]
struct Cli {
    /// Config file (default: <config dir>/shotpath/screenshot_config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Console log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the clipboard and serve the hotkeys (default)
    Run {
        /// Save to this directory for this session only
        #[arg(long, value_name = "DIR")]
        save_path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,

    /// Change the screenshot directory
    SetPath {
        /// New save directory, created if missing
        dir: PathBuf,
    },

    /// Change the paste hotkey, e.g. ctrl+alt+p
    SetHotkey {
        combo: String,
    },

    /// Check clipboard access, keyboard simulation and the save directory
    SelfTest,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match cli.command.unwrap_or(Commands::Run { save_path: None }) {
        Commands::Run { save_path } => cmd_run(config_path, save_path),
        Commands::Config => cmd_config(config_path),
        Commands::SetPath { dir } => cmd_set_path(config_path, dir),
        Commands::SetHotkey { combo } => cmd_set_hotkey(config_path, &combo),
        Commands::SelfTest => cmd_self_test(config_path),
    }
}

/// File logging under the data directory, `env_logger` if that fails
fn init_logging(verbosity: u8) {
    let console_level = logging::console_level(verbosity);
    let file_level = if verbosity >= 2 { "debug" } else { "info" };

    let result = ensure_directories().and_then(|(data_dir, _)| {
        logging::init_logger(
            data_dir.join("logs").join("shotpath.log"),
            file_level,
            console_level,
        )
    });

    if let Err(e) = result {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(console_level))
            .init();
        log::warn!("File logging unavailable: {:#}", e);
    }
}

fn load_context(config_path: PathBuf) -> Result<AppContext> {
    AppContext::load(Box::new(JsonConfigStorage::new(config_path)), None)
}

fn cmd_run(config_path: PathBuf, save_path: Option<PathBuf>) -> Result<()> {
    log::info!("Starting shotpath {}", env!("CARGO_PKG_VERSION"));

    app::start(
        StartOptions {
            config_path,
            save_path,
        },
        Arc::new(ConsoleNotifier),
    )
}

fn cmd_config(config_path: PathBuf) -> Result<()> {
    let ctx = load_context(config_path)?;
    let config = ctx.config();

    println!("Configuration");
    println!("=============");
    println!("Config file: {}", ctx.config_path().display());
    println!("Save path:   {}", config.save_path.display());
    println!("Resolved:    {}", ctx.save_dir().display());
    println!("Hotkey:      {}", config.hotkey);

    Ok(())
}

fn cmd_set_path(config_path: PathBuf, dir: PathBuf) -> Result<()> {
    let ctx = load_context(config_path)?;
    let resolved = ctx.set_save_path(&dir)?;
    println!("Screenshots will be saved to {}", resolved.display());
    Ok(())
}

fn cmd_set_hotkey(config_path: PathBuf, combo: &str) -> Result<()> {
    let combination: Combination = combo
        .parse()
        .with_context(|| format!("Invalid hotkey '{}'", combo))?;
    let combination = validate_primary(combination)?;

    let ctx = load_context(config_path)?;
    ctx.set_hotkey(&combination)?;
    println!(
        "Paste hotkey set to {} (takes effect on next start)",
        combination.label()
    );
    Ok(())
}

fn cmd_self_test(config_path: PathBuf) -> Result<()> {
    let ctx = load_context(config_path)?;
    let clipboard = clipboard::create_backend().context("Failed to open clipboard")?;

    let checks = app::self_test(&clipboard, &ctx);

    println!("Self-test");
    println!("=========");
    for check in &checks {
        match &check.outcome {
            Ok(detail) => println!("  ok      {:<16} {}", check.name, detail),
            Err(e) => println!("  FAILED  {:<16} {}", check.name, e),
        }
    }

    let failed = checks.iter().filter(|check| !check.passed()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} checks failed", failed, checks.len());
    }
    Ok(())
}
