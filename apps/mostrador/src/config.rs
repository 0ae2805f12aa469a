use std::env;
#[cfg(test)]
use std::sync::Mutex;

use crate::api::{ApiConfig, CatalogError};

pub const DEFAULT_SERVER: &str = "127.0.0.1:3000";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "secret";

/// Mostrador application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog server address (host:port or full URL)
    pub server: String,
    /// Basic-auth username sent with every request
    pub username: String,
    /// Basic-auth password sent with every request
    pub password: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server =
            env::var("MOSTRADOR_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let username =
            env::var("MOSTRADOR_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string());
        let password =
            env::var("MOSTRADOR_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.to_string());
        Self {
            server,
            username,
            password,
        }
    }

    pub fn api_config(&self) -> Result<ApiConfig, CatalogError> {
        Ok(ApiConfig::new(&self.server)?.with_credentials(&self.username, &self.password))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}
