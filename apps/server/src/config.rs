//! Application configuration.
//!
//! Configuration is loaded once at startup from layered sources (built-in
//! defaults, an optional per-environment TOML file, then `COURTSIDE__`
//! environment variables), validated, and passed around behind an `Arc`.
//! Nothing reads the environment after startup.

use anyhow::Context;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means no cross-origin access.
    pub cors_origins: Vec<String>,
    /// Request body size cap in bytes.
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_min_size: u32,
    pub pool_max_size: u32,
    pub acquire_timeout_seconds: u64,
    /// Apply embedded migrations on startup.
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to verify access tokens. Token issuance lives in the
    /// identity service; this server only validates.
    pub token_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// One of `daily`, `hourly`, `minutely`, `never`.
    pub file_rotation: String,
    pub service_name: String,
    pub deployment_environment: String,
}

impl Config {
    /// Load configuration: defaults, then `config/{COURTSIDE_ENV}.toml` if
    /// present, then `COURTSIDE__`-prefixed environment variables
    /// (e.g. `COURTSIDE__DATABASE__URL`).
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is fine; real environments set variables directly.
        let _ = dotenvy::dotenv();

        let run_env =
            std::env::var("COURTSIDE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("server.max_request_body_size", 1024 * 1024)?
            .set_default("database.url", "")?
            .set_default("database.pool_min_size", 1)?
            .set_default("database.pool_max_size", 10)?
            .set_default("database.acquire_timeout_seconds", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.token_secret", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("logging.file_enabled", false)?
            .set_default("logging.file_directory", "logs")?
            .set_default("logging.file_prefix", "courtside")?
            .set_default("logging.file_rotation", "daily")?
            .set_default("logging.service_name", "courtside-server")?
            .set_default("logging.deployment_environment", run_env.clone())?
            .add_source(config::File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(config::Environment::with_prefix("COURTSIDE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate invariants that the type system cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url must be set");
        }
        if self.auth.token_secret.len() < 32 {
            anyhow::bail!("auth.token_secret must be at least 32 characters");
        }
        if self.database.pool_max_size == 0 {
            anyhow::bail!("database.pool_max_size must be at least 1");
        }
        if self.database.pool_min_size > self.database.pool_max_size {
            anyhow::bail!("database.pool_min_size must not exceed pool_max_size");
        }
        if !matches!(
            self.logging.file_rotation.as_str(),
            "daily" | "hourly" | "minutely" | "never"
        ) {
            anyhow::bail!(
                "logging.file_rotation '{}' is not one of daily, hourly, minutely, never",
                self.logging.file_rotation
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.to_socket_addrs()
            .with_context(|| format!("Failed to resolve listen address {addr}"))?
            .next()
            .with_context(|| format!("No socket address for {addr}"))
    }
}
