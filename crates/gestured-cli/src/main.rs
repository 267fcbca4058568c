use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "gestured", version, about = "gestured CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines sensor trace through the engine
    Replay {
        /// Trace file, one event per line
        path: PathBuf,
        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show which detectors are armed with the screen off
    Status {
        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("GESTURED_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Replay { path, config } => commands::replay::run(&path, config.as_deref()),
        Commands::Status { config } => commands::status::run(config.as_deref()),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
