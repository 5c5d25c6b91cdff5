//! waypoint: convention-based HTTP router
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                     WAYPOINT                      │
//!                        │                                                   │
//!   route declarations   │  ┌──────────┐    ┌──────────┐    ┌────────────┐  │
//!   ─────────────────────┼─▶│  mount   │───▶│ routing  │───▶│  ArcSwap   │  │
//!   (ConventionSource)   │  │ builder  │    │  table   │    │  registry  │  │
//!                        │  └──────────┘    └──────────┘    └─────┬──────┘  │
//!                        │                                        │         │
//!   Client Request       │  ┌──────────┐    ┌──────────┐          ▼         │
//!   ─────────────────────┼─▶│   http   │───▶│ resolve  │◀──── snapshot      │
//!                        │  │  server  │    └────┬─────┘                    │
//!                        │  └──────────┘         ▼                          │
//!   Client Response      │  ┌──────────┐    ┌──────────┐                    │
//!   ◀────────────────────┼──│ response │◀───│ dispatch │ hooks → handler    │
//!                        │  │  record  │    │  chain   │                    │
//!                        │  └──────────┘    └──────────┘                    │
//!                        │                                                   │
//!                        │  config · observability · lifecycle (signals)     │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use waypoint::config::loader::{config_path, load_from_dir, write_default};
use waypoint::demo::demo_source;
use waypoint::lifecycle::Startup;
use waypoint::mount::build;
use waypoint::observability::init_logging;

#[derive(Parser)]
#[command(name = "waypoint", version)]
#[command(about = "Convention-based HTTP router", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the routes and start serving
    Start {
        /// Application directory containing waypoint.toml
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Override listener.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override listener.hostname
        #[arg(long)]
        hostname: Option<String>,

        /// Reload waypoint.toml and remount when it changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Write a default waypoint.toml
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the mounted route table in match order
    Routes {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Start {
            dir,
            port,
            hostname,
            watch,
        } => {
            let mut config = load_from_dir(&dir)?;
            if let Some(port) = port {
                config.listener.port = port;
            }
            if let Some(hostname) = hostname {
                config.listener.hostname = hostname;
            }

            init_logging(&config.observability);
            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                dir = %dir.display(),
                address = %config.listener.bind_address(),
                "waypoint starting"
            );

            let source = demo_source(config.routes.clone());
            let mut startup = Startup::new(config, source);
            if watch {
                startup = startup.watch(config_path(&dir));
            }
            startup.run().await?;
        }
        Commands::Init { dir, force } => {
            let path = write_default(&dir, force)?;
            println!("wrote {}", path.display());
        }
        Commands::Routes { dir } => {
            let config = load_from_dir(&dir)?;
            let (table, report) = build(&demo_source(config.routes))?;

            for token in table.methods() {
                let label = token.to_string();
                for endpoint in table.partition(token) {
                    println!(
                        "{:<8} {:<24} {:<28} hooks={}",
                        label,
                        endpoint.route().pattern(),
                        endpoint.source(),
                        endpoint.hook_count()
                    );
                }
            }
            for skipped in &report.skipped {
                println!("skipped  {:<24} {}", skipped.source, skipped.error);
            }
        }
    }
    Ok(())
}
