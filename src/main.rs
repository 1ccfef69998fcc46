//! FlowLine CLI
//!
//! Command-line interface for the FlowLine dashboard:
//! - Serve the dashboard over HTTP
//! - Render the page once
//! - Check Firestore connectivity
//! - Print the default config

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use flowline::config::{generate_default_config, Config, ConfigLoad};
use flowline::connector::{AmbientEnv, FirestoreConnector, Notice, ServiceConnector};
use flowline::dashboard::{Dashboard, DashboardOptions};
use flowline::server::{serve, AppState};

#[derive(Parser)]
#[command(name = "flowline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FlowLine Prototype map dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Attempt the Firestore connection and show its status
        #[arg(long)]
        connectivity_check: bool,
    },

    /// Render the dashboard page once
    Render {
        /// Attempt the Firestore connection and show its status
        #[arg(long)]
        connectivity_check: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Attempt the Firestore connection and report the outcome
    Check,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        write_output(output.as_ref(), &generate_default_config())?;
        return Ok(ExitCode::SUCCESS);
    }

    let loaded = match &cli.config {
        Some(path) => ConfigLoad {
            config: Config::load_with_env(path)?,
            source: Some(path.clone()),
            errors: Vec::new(),
        },
        None => Config::load_default(),
    };

    flowline::telemetry::init(&loaded.config.logging)?;

    for error in &loaded.errors {
        tracing::warn!("Skipping config file: {}", error);
    }
    match &loaded.source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    let mut config = loaded.config;

    match cli.command {
        Commands::Serve {
            host,
            port,
            connectivity_check,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.dashboard.connectivity_check |= connectivity_check;

            tracing::info!("Starting FlowLine v{}", env!("CARGO_PKG_VERSION"));

            let options = DashboardOptions::from_settings(&config.dashboard);
            let state = if options.connectivity_check {
                tracing::info!("Connectivity check enabled");
                AppState::with_connector(options, build_connector(&config)?)
            } else {
                tracing::info!("Connectivity check disabled (set connectivity_check to enable)");
                AppState::new(options)
            };

            serve(state, &config.server).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Render {
            connectivity_check,
            output,
        } => {
            config.dashboard.connectivity_check |= connectivity_check;

            let options = DashboardOptions::from_settings(&config.dashboard);
            let connector = if options.connectivity_check {
                Some(build_connector(&config)?)
            } else {
                None
            };

            let page = Dashboard::new(options, connector).render_page().await;
            write_output(output.as_ref(), &page.to_html())?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check => {
            let connector = build_connector(&config)?;
            let lookup = connector.get_service_handle().await;

            for notice in &lookup.notices {
                match notice {
                    Notice::Warning(text) => eprintln!("warning: {}", text),
                    Notice::Info(text) => eprintln!("info: {}", text),
                }
            }
            println!("{}", lookup.outcome.status_message());

            match lookup.outcome.handle() {
                Some(handle) => {
                    println!("  project:  {}", handle.project_id());
                    println!("  database: {}", handle.database());
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(ExitCode::FAILURE),
            }
        }

        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn build_connector(config: &Config) -> anyhow::Result<Arc<ServiceConnector>> {
    let backend = FirestoreConnector::new(config.firestore.clone(), AmbientEnv::capture())
        .context("failed to build Firestore client")?;
    Ok(Arc::new(ServiceConnector::new(Arc::new(backend))))
}

fn write_output(path: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
