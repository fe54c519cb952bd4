//! Command line interface.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

pub use commands::Via;

#[derive(Parser)]
#[command(name = "tenderfetch")]
#[command(about = "Export the GGGI current tender listing to a spreadsheet")]
#[command(version)]
pub struct Cli {
    /// Config file (default: discovered tenderfetch.{toml,yaml,json})
    #[arg(long, global = true, env = "TENDERFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Bind address: port, host, or host:port (default from config)
        bind: Option<String>,
    },

    /// Fetch every page and write the spreadsheet to disk
    Export {
        /// Output path (default: the configured download filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a single page and report what came back
    Probe {
        /// Page number
        #[arg(default_value_t = 1)]
        page: u32,

        /// Which fetch path to use
        #[arg(long, value_enum, default_value_t = Via::Resilient)]
        via: Via,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, _config) = load_settings_with_options(LoadOptions {
        config_path: cli.config,
    })
    .await?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            commands::cmd_serve(settings, &bind).await
        }
        Commands::Export { output } => commands::cmd_export(&settings, output).await,
        Commands::Probe { page, via } => commands::cmd_probe(&settings, page, via).await,
    }
}
