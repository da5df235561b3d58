mod config_commands;
mod replay_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    msghub_config::MsghubConfig,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "msghub", about = "msghub: envelope listener toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the default locations.
    #[arg(long, global = true, env = "MSGHUB_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch newline-delimited JSON envelopes through a listener and print
    /// the outbound feedback.
    Replay {
        /// Input file; stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the resolved configuration.
    Config {
        /// Print JSON instead of TOML.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<MsghubConfig> {
    match &cli.config {
        Some(path) => Ok(msghub_config::load_config(path)?),
        None => Ok(msghub_config::discover_and_load()),
    }
}

/// Initialise tracing. Logs go to stderr so stdout stays machine-readable.
fn init_telemetry(cli: &Cli, config: &MsghubConfig) {
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs || config.logging.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_telemetry(&cli, &config);
    debug!(version = env!("CARGO_PKG_VERSION"), "msghub starting");

    match cli.command {
        Commands::Replay { file } => replay_commands::replay(file.as_deref(), &config).await,
        Commands::Config { json } => config_commands::print(&config, json),
    }
}
