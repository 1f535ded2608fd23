//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::tuning::{DEFAULT_ROOM_ID, ROOM_CAPACITY};
use crate::util::rate_limit::INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty means any origin
    pub client_origins: Vec<String>,

    /// Reserved room that exists from boot and is never deleted
    pub default_room: String,
    /// Maximum members per room
    pub room_capacity: usize,
    /// Seed for the world RNG, random when unset
    pub game_seed: Option<u64>,
    /// Inbound messages per second allowed per connection
    pub input_rate_limit: u32,
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

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        let default_room = env::var("DEFAULT_ROOM")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOM_ID.to_string());

        let room_capacity: usize = parse_var("ROOM_CAPACITY")?.unwrap_or(ROOM_CAPACITY);
        if room_capacity == 0 {
            return Err(ConfigError::Invalid("ROOM_CAPACITY"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origins,
            default_room,
            room_capacity,
            game_seed: parse_var("GAME_SEED")?,
            input_rate_limit: parse_var("INPUT_RATE_LIMIT")?.unwrap_or(INPUT_RATE_LIMIT),
        })
    }
}

/// Parse an optional variable, failing only when it is present but malformed
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Split a comma-separated origin list; `*` means any origin
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "*")
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
