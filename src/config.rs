use std::env;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::schedule::types::normalize_max_per_slot;
use crate::schedule::Options;

/// Top-level configuration, read from the environment (and `.env` if present)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    /// Engine rules used when a request or CLI flag doesn't override them
    pub options: Options,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("DUTY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("DUTY_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let log_level = env::var("DUTY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let options = Options {
            prevent_consecutive: env_flag("DUTY_PREVENT_CONSECUTIVE"),
            max_per_slot: normalize_max_per_slot(
                env::var("DUTY_MAX_PER_SLOT")
                    .ok()
                    .and_then(|raw| raw.trim().parse::<i64>().ok()),
            ),
            ignore_consecutive_limit: env_flag("DUTY_IGNORE_CONSECUTIVE_LIMIT"),
        };

        Ok(Self {
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            options,
        })
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DUTY_PORT must be a valid u16")]
    InvalidPort,
    #[error("DUTY_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
}
