use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "smart-boiler-cli", version, about = "Smart Boiler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learning threshold inspection and control
    Threshold {
        #[command(subcommand)]
        action: commands::threshold::ThresholdAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Compute the urgency score from explicit inputs
    Score(commands::score::ScoreArgs),
    /// Feed recorded state changes through the engine
    Replay(commands::replay::ReplayArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SMART_BOILER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Threshold { action } => commands::threshold::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Score(args) => commands::score::run(args),
        Commands::Replay(args) => commands::replay::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
