//! Sprig CLI - static site generator for declarative YAML documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Static site generator for declarative YAML documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sprig.toml config file
    #[arg(short, long, default_value = "sprig.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a site in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build, watch and serve with live reload
    Dev {
        /// Port to listen on (defaults to config or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Disable live reload
        #[arg(long)]
        no_reload: bool,

        /// Open browser once serving
        #[arg(long)]
        open: bool,
    },

    /// Build the site once
    Build {
        /// Output directory (defaults to config or "output")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Directory to serve (defaults to config or "output")
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
        Commands::Dev {
            port,
            no_reload,
            open,
        } => {
            let overrides = commands::dev::DevOverrides {
                port,
                no_reload,
                open,
            };
            commands::dev::run(cli.config, overrides).await?;
        }
        Commands::Build { output } => {
            commands::build::run(&cli.config, output).await?;
        }
        Commands::Serve { port, dir, no_open } => {
            commands::serve::run(&cli.config, port, dir, !no_open).await?;
        }
    }

    Ok(())
}
