//! WebIOPi - embedded HTTP server
//!
//! This is the main entry point for the WebIOPi CLI.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webiopi_api::{BasicAuth, HttpServer};
use webiopi_core::config::{ConfigLoader, ContextPrefix, ServeMode, ServerConfig};

use crate::demo::DemoHandler;

/// WebIOPi - REST API, Basic auth and static files on a single port
#[derive(Parser)]
#[command(name = "webiopi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server with a configuration file (TOML or JSON)
    Run {
        /// Path to the configuration file
        #[arg(default_value = "webiopi.toml")]
        config: PathBuf,
    },

    /// Start a server without a configuration file
    Serve {
        /// Host to listen on
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// URL prefix of the API
        #[arg(long, default_value = "/")]
        context: String,

        /// Document root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Index file name
        #[arg(long, default_value = "index.html")]
        index: String,

        /// Login for Basic authentication
        #[arg(long, requires = "password")]
        login: Option<String>,

        /// Password for Basic authentication
        #[arg(long, requires = "login")]
        password: Option<String>,

        /// Serve each connection on its own task
        #[arg(long)]
        per_connection: bool,
    },

    /// Print the auth digest for a login and password
    Passwd {
        #[arg(long)]
        login: String,

        #[arg(long)]
        password: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Run { config } => {
            tracing::info!("Starting WebIOPi with config: {}", config.display());
            let config = ConfigLoader::load(&config)?;
            run_server(config)?;
        }

        Commands::Serve {
            host,
            port,
            context,
            root,
            index,
            login,
            password,
            per_connection,
        } => {
            let auth = match (login, password) {
                (Some(login), Some(password)) => Some(BasicAuth::digest_for(&login, &password)),
                _ => None,
            };

            let config = ServerConfig {
                host,
                port,
                context: ContextPrefix::new(context),
                doc_root: root,
                index,
                auth,
                serve_mode: if per_connection {
                    ServeMode::PerConnection
                } else {
                    ServeMode::Serial
                },
                ..Default::default()
            };
            run_server(config)?;
        }

        Commands::Passwd { login, password } => {
            println!("{}", BasicAuth::digest_for(&login, &password).to_hex());
        }

        Commands::Version => {
            println!("WebIOPi v{}", webiopi_core::VERSION);
        }
    }

    Ok(())
}

fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!("🚀 Starting WebIOPi v{}", webiopi_core::VERSION);
    if config.auth.is_none() {
        tracing::warn!("⚠️ Access unprotected: no authentication configured");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let server = HttpServer::new(config, Arc::new(DemoHandler::new()));
        server.start()?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C, shutting down");
        server.stop().await?;
        Ok(())
    })
}
