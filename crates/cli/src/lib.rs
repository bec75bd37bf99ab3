pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use backchannel_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "backchannel",
    about = "Interruption filter operator CLI",
    long_about = "Classify transcripts as backchanneling or interruptions, replay recorded sessions, and inspect filter configuration.",
    after_help = "Examples:\n  backchannel classify \"yeah\" --speaking\n  backchannel replay session.jsonl\n  backchannel doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Read configuration from this file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Decide whether one transcript should interrupt the agent")]
    Classify {
        text: String,
        #[arg(long, help = "Treat the agent as currently speaking")]
        speaking: bool,
        #[arg(long, value_name = "LABEL", help = "Agent state label recorded with the decision")]
        state: Option<String>,
    },
    #[command(about = "Replay a JSON-lines transcript file through the filter")]
    Replay { file: PathBuf },
    #[command(about = "Inspect effective filter configuration with source attribution")]
    Config,
    #[command(about = "Validate config, ignore vocabulary, and decision smoke scenarios")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = load_options(cli.config.clone());

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Classify { text, speaking, state } => {
            commands::classify::run(&options, &text, speaking, state.as_deref())
        }
        Command::Replay { file } => commands::replay::run(&options, &file),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// An explicit `--config` path must exist; otherwise the default locations
/// are optional.
pub fn load_options(config_path: Option<PathBuf>) -> LoadOptions {
    LoadOptions { require_file: config_path.is_some(), config_path, ..LoadOptions::default() }
}

/// Logs go to stderr so command payloads on stdout stay machine-readable.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded; keep it.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
