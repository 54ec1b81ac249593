//! Marginalia 命令行入口
//!
//! 代替图形外壳驱动完整流程：读取文本、后台分析、打印对话框内容。

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use marginalia_lib::{commands, AnalysisKind, AppConfig, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "marginalia", version, about = "Analyze selected text with hosted models", long_about = None)]
struct Cli {
    /// Increase logging verbosity.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Override the default configuration path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize, classify sentiment or detect emotion of TEXT (stdin when omitted).
    Analyze {
        /// summarize, sentiment or emotion.
        #[arg(long, short)]
        kind: AnalysisKind,

        /// Text to analyze.
        text: Option<String>,
    },
    /// Inspect the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the configuration file path.
    Path,
    /// Print the effective configuration.
    Show,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "marginalia=debug"
    } else {
        "marginalia=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .init();
    Ok(())
}

fn resolve_config_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path),
        None => AppConfig::config_path(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    info!("Starting Marginalia v{}", env!("CARGO_PKG_VERSION"));

    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Path => println!("{}", config_path.display()),
            ConfigAction::Show => {
                let config = AppConfig::load_from(&config_path)?;
                print!("{}", config.to_display_toml()?);
            }
        },
        Command::Analyze { kind, text } => {
            let config = AppConfig::load_from(&config_path)?;
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read text from stdin")?;
                    buffer
                }
            };

            let (state, mut completions) = AppState::new(config)?;

            let dialog = match commands::submit_selection(&state, Some(&text), kind) {
                Ok(id) => {
                    let completion = completions
                        .recv()
                        .await
                        .context("Analysis task ended without a result")?;
                    info!("Received completion for request {}", id);
                    commands::present(&completion)
                }
                Err(dialog) => dialog,
            };

            if dialog.level.is_failure() {
                eprintln!("{}", dialog);
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", dialog);
        }
    }

    Ok(ExitCode::SUCCESS)
}
