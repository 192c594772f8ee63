//! Configuration management

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub cors_enabled: bool,
    /// Start with the fixed set of four contacts
    pub seed: bool,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3001,
            cors_enabled: true,
            seed: true,
            max_body_bytes: 64 * 1024, // 64KB
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional TOML file, then environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("PHONEBOOK_CONFIG") {
            Ok(path) => Self::from_toml(path)?,
            Err(_) => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid PORT: {}", e)))?;
        }

        if let Some(host) = lookup("PHONEBOOK_BIND_HOST") {
            self.bind_host = host;
        }

        if let Some(cors) = lookup("PHONEBOOK_CORS") {
            self.cors_enabled = parse_bool("PHONEBOOK_CORS", &cors)?;
        }

        if let Some(seed) = lookup("PHONEBOOK_SEED") {
            self.seed = parse_bool("PHONEBOOK_SEED", &seed)?;
        }

        if let Some(size) = lookup("PHONEBOOK_MAX_BODY_BYTES") {
            self.max_body_bytes = size.trim().parse()
                .map_err(|e| ConfigError::Invalid(format!("Invalid PHONEBOOK_MAX_BODY_BYTES: {}", e)))?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".to_string()));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be > 0".to_string()));
        }

        self.bind_host.parse::<IpAddr>()
            .map_err(|e| ConfigError::Invalid(format!("Invalid bind_host: {}", e)))?;

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_host.parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid bind_host: {}", e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!("Invalid {}: {}", key, other))),
    }
}
