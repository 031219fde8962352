//! Configuration for the fibnet server and client.
//!
//! The run mode comes from the command line; tuning knobs can also come
//! from a TOML configuration file. CLI arguments take precedence over
//! config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "fibnet")]
#[command(version = "0.1.0")]
#[command(about = "Streams Fibonacci values over TCP", long_about = None)]
pub struct CliArgs {
    /// Run as server, listening on the given port
    #[arg(long, value_name = "PORT", conflicts_with = "client")]
    pub server: Option<u16>,

    /// Run as client against the given host and port
    #[arg(long, num_args = 2, value_names = ["HOST", "PORT"])]
    pub client: Option<Vec<String>>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Cap on concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds a connection may sit idle before the server closes it
    /// (0 = wait forever)
    #[serde(default)]
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            max_connections: default_max_connections(),
            idle_timeout_secs: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_connections() -> usize {
    10000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which role this process runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Server { port: u16 },
    Client { host: String, port: u16 },
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub bind_host: String,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::resolve(cli, toml_config)
    }

    fn resolve(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let mode = match (cli.server, cli.client) {
            (Some(port), None) => Mode::Server { port },
            (None, Some(client)) => {
                // clap guarantees exactly two values for --client
                let host = client[0].clone();
                let port = parse_port(&client[1])?;
                Mode::Client { host, port }
            }
            _ => return Err(ConfigError::MissingMode),
        };

        Ok(Config {
            mode,
            bind_host: toml_config.server.bind_host,
            max_connections: toml_config.server.max_connections,
            idle_timeout_secs: toml_config.server.idle_timeout_secs,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Ports are u16 on the wire; anything else is rejected at the boundary.
fn parse_port(s: &str) -> Result<u16, ConfigError> {
    s.parse()
        .map_err(|_| ConfigError::InvalidPort(s.to_string()))
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidPort(String),
    MissingMode,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidPort(s) => {
                write!(f, "Invalid port '{}': expected an integer in 0-65535", s)
            }
            ConfigError::MissingMode => {
                write!(f, "Expected one of --server <port> or --client <host> <port>")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
