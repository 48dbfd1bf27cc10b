//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS ("*" for permissive)
    pub client_origin: String,

    /// World width in canvas units
    pub world_width: f32,
    /// World height in canvas units
    pub world_height: f32,
    /// Seed for asteroid generation and spawn placement
    pub world_seed: u64,

    /// Password for the root side-channel; unset means root requests
    /// are always denied
    pub root_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            world_width: positive("WORLD_WIDTH", parse_or("WORLD_WIDTH", 1200.0)?)?,
            world_height: positive("WORLD_HEIGHT", parse_or("WORLD_HEIGHT", 800.0)?)?,

            world_seed: match env::var("WORLD_SEED") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber("WORLD_SEED"))?,
                Err(_) => rand::random(),
            },

            root_password: env::var("ROOT_PASSWORD").ok(),
        })
    }
}

fn parse_or(key: &'static str, default: f32) -> Result<f32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key)),
        Err(_) => Ok(default),
    }
}

/// World dimensions must be finite and positive; anything else fails
/// startup instead of panicking deep inside world generation.
fn positive(key: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumber(key))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}
