//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use overlink_core::crypto::KEY_LEN;
use overlink_core::domain::SharedWorkerConfig;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where build jobs are dispatched.
#[derive(Clone, Debug)]
pub struct GithubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub token: String,
}

/// Object-storage deletion target. Deletion is skipped when absent.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub token: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub encryption_key: String,
    pub cron_secret: String,
    pub github: GithubConfig,
    pub auth_json_base64: Option<String>,
    pub cdn_base_url: String,
    pub storage: Option<StorageConfig>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Secrets ---
        let encryption_key = required("ENCRYPTION_KEY")?;
        if encryption_key.len() != KEY_LEN {
            return Err(ConfigError::InvalidValue(
                "ENCRYPTION_KEY".to_string(),
                format!("must be exactly {} bytes, got {}", KEY_LEN, encryption_key.len()),
            ));
        }
        let cron_secret = required("CRON_SECRET")?;

        // --- Build Dispatch ---
        let github = GithubConfig {
            api_url: or_default("GITHUB_API_URL", "https://api.github.com")
                .trim_end_matches('/')
                .to_string(),
            owner: required("GITHUB_OWNER")?,
            repo: required("GITHUB_REPO")?,
            token: required("GITHUB_TOKEN")?,
        };
        let auth_json_base64 = lookup("AUTH_JSON_BASE64").filter(|v| !v.is_empty());

        // --- Public Assets ---
        let cdn_base_url = or_default("CDN_BASE_URL", "https://cdn.overlink.com")
            .trim_end_matches('/')
            .to_string();
        let storage = lookup("STORAGE_ENDPOINT")
            .filter(|v| !v.is_empty())
            .map(|endpoint| StorageConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                token: lookup("STORAGE_TOKEN").filter(|v| !v.is_empty()),
            });

        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            encryption_key,
            cron_secret,
            github,
            auth_json_base64,
            cdn_base_url,
            storage,
            cors_origin,
        })
    }

    /// Settings passed through to every build job.
    pub fn shared_worker_config(&self) -> SharedWorkerConfig {
        SharedWorkerConfig {
            auth_json_base64: self.auth_json_base64.clone(),
        }
    }

    /// The public URL a project's PDF is served from.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}.pdf", self.cdn_base_url, filename)
    }
}
