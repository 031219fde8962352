//! fibnet: a two-role TCP utility for streaming Fibonacci values
//!
//! Server mode accepts connections and answers each request byte with the
//! Binet closed-form value for that index, one text line per request.
//! Client mode reads indices from stdin, one per line, and prints the
//! server's responses.
//!
//! Run one of:
//! - `fibnet --server <port>`
//! - `fibnet --client <host> <port>`

mod client;
mod config;
mod protocol;
mod server;

use client::ClientError;
use config::{Config, Mode};
use server::ServerError;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// One exit code per fatal condition so callers can tell them apart.
const EXIT_CONFIG: u8 = 2;
const EXIT_BIND_FAILED: u8 = 3;
const EXIT_CONNECT_FAILED: u8 = 4;
const EXIT_UNKNOWN_HOST: u8 = 5;
const EXIT_ACCEPT_FAILED: u8 = 6;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &config.mode {
        Mode::Server { port } => run_server(&config, *port).await,
        Mode::Client { host, port } => run_client(host, *port).await,
    }
}

async fn run_server(config: &Config, port: u16) -> ExitCode {
    info!(port, "Starting fibnet server");

    let server = server::Server::new(config, port);
    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ ServerError::Bind(_)) => {
            error!(error = %e, "Server failed to start");
            ExitCode::from(EXIT_BIND_FAILED)
        }
        Err(e @ ServerError::Accept(_)) => {
            error!(error = %e, "Accept loop failed");
            ExitCode::from(EXIT_ACCEPT_FAILED)
        }
    }
}

async fn run_client(host: &str, port: u16) -> ExitCode {
    let input = BufReader::new(tokio::io::stdin());
    match client::run(host, port, input).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ ClientError::UnknownHost(_)) => {
            error!(error = %e, "Could not resolve host");
            ExitCode::from(EXIT_UNKNOWN_HOST)
        }
        Err(e @ ClientError::Connect(_)) => {
            error!(error = %e, "Could not connect");
            ExitCode::from(EXIT_CONNECT_FAILED)
        }
        Err(e @ ClientError::Io(_)) => {
            error!(error = %e, "Session failed");
            ExitCode::FAILURE
        }
    }
}
