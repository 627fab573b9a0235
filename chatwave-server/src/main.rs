#![cfg_attr(not(test), forbid(unsafe_code))]

//! Main entry point for the Chatwave messaging server.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::error::Error;
use std::path::PathBuf;

use chatwave_shared::config::Config;

mod app_state;
mod db;
mod handlers;
mod http;
mod middleware;
mod realtime;
mod routes;
mod server;
mod services;
mod tracer;

/// Chatwave server CLI.
#[derive(Parser)]
#[command(name = "chatwave")]
#[command(about = "Realtime messaging server for Chatwave", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for the Chatwave CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the messaging server
    Serve {
        /// Port to bind; falls back to configuration when omitted
        #[arg(long, short)]
        port: Option<u16>,

        /// Path to a configuration file (yaml or json)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Initializes environment variables and returns the parsed CLI.
#[must_use]
pub fn initialize_cli() -> Cli {
    dotenv().ok();
    Cli::parse()
}

/// Loads configuration and starts the server.
///
/// # Errors
/// Returns an error if configuration loading or server startup fails.
pub async fn handle_serve_command(
    port: Option<u16>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let resolved_config =
        Config::load_config(config, port).map_err(|err| -> Box<dyn Error> { Box::new(err) })?;
    server::run(resolved_config).await
}

/// Main application entry point.
///
/// # Errors
/// Returns an error if the application fails to initialize or run.
pub async fn run_app() -> Result<(), Box<dyn Error>> {
    let cli = initialize_cli();

    match cli.command {
        Commands::Serve { port, config } => {
            handle_serve_command(port, config).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run_app().await
}
