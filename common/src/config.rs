// common/src/config.rs
use config::{Config as ConfigFile, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::credential::{DEFAULT_TOKEN_TTL_SECS, MAX_TTL_SECS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("credential.jwt_secret must be set")]
    MissingJwtSecret,

    #[error("store.url and store.service_key are required for the rest backend")]
    MissingStoreCredentials,

    #[error("rate_limit.max_requests must be greater than zero")]
    InvalidRateLimit,

    #[error("{0} must be between 1 and 31536000 seconds")]
    InvalidTtl(&'static str),
}

/// Central configuration for the verify-server
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    /// Value of `Access-Control-Allow-Origin`
    pub allowed_origin: String,
    /// Upper bound on accepted JSON bodies
    pub max_payload_bytes: usize,
    pub store: StoreConfig,
    pub credential: CredentialConfig,
    pub challenge: ChallengeConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Rest,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Trusted, full-access service credential
    pub service_key: String,
    pub table: String,
    pub timeout_ms: u64,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub jwt_secret: String,
    pub ttl_secs: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Only accept nonces issued by `POST /challenge`
    pub enforce: bool,
    pub ttl_secs: i64,
    pub cleanup_interval_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub paths: Vec<String>,
    /// Key clients on forwarding headers; only safe behind a proxy that sets them
    pub trust_forwarded_for: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8081".to_string(),
            allowed_origin: "*".to_string(),
            max_payload_bytes: 16 * 1024,
            store: StoreConfig::default(),
            credential: CredentialConfig::default(),
            challenge: ChallengeConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: String::new(),
            service_key: String::new(),
            table: "wallet_identities".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            enforce: false,
            ttl_secs: 300,
            cleanup_interval_secs: 60,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
            paths: vec!["/verify-wallet".to_string(), "/challenge".to_string()],
            trust_forwarded_for: false,
        }
    }
}

// Secrets never reach the logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_addr", &self.server_addr)
            .field("allowed_origin", &self.allowed_origin)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("store", &self.store)
            .field("credential", &self.credential)
            .field("challenge", &self.challenge)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("service_key", &redacted(&self.service_key))
            .field("table", &self.table)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("jwt_secret", &redacted(&self.jwt_secret))
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__CREDENTIAL__JWT_SECRET
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Variable names used by existing edge-function deployments
            .set_override_option("credential.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("store.url", env::var("SUPABASE_URL").ok())?
            .set_override_option(
                "store.backend",
                env::var("SUPABASE_URL").ok().map(|_| "rest".to_string()),
            )?
            .set_override_option(
                "store.service_key",
                env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            )?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env()
            }
        }
    }

    fn from_plain_env() -> Self {
        let defaults = Self::default();

        let store_url = env::var("SUPABASE_URL").unwrap_or_default();
        let backend = if store_url.is_empty() {
            StoreBackend::Memory
        } else {
            StoreBackend::Rest
        };

        Self {
            server_addr: env::var("VERIFY_SERVER_ADDR").unwrap_or(defaults.server_addr),
            allowed_origin: env::var("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            max_payload_bytes: env::var("MAX_PAYLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_payload_bytes),
            store: StoreConfig {
                backend,
                url: store_url,
                service_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
                table: env::var("IDENTITY_TABLE").unwrap_or(defaults.store.table),
                timeout_ms: env::var("STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.store.timeout_ms),
            },
            credential: CredentialConfig {
                jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
                ttl_secs: defaults.credential.ttl_secs,
            },
            challenge: ChallengeConfig {
                enforce: env::var("ENFORCE_SERVER_NONCE")
                    .map(|v| v.to_lowercase() == "true")
                    .unwrap_or(defaults.challenge.enforce),
                ..defaults.challenge
            },
            rate_limit: defaults.rate_limit,
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.credential.jwt_secret.is_empty() {
            return Err(ConfigValidationError::MissingJwtSecret);
        }
        if self.store.backend == StoreBackend::Rest
            && (self.store.url.is_empty() || self.store.service_key.is_empty())
        {
            return Err(ConfigValidationError::MissingStoreCredentials);
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigValidationError::InvalidRateLimit);
        }
        if !(1..=MAX_TTL_SECS).contains(&self.credential.ttl_secs) {
            return Err(ConfigValidationError::InvalidTtl("credential.ttl_secs"));
        }
        if !(1..=MAX_TTL_SECS).contains(&self.challenge.ttl_secs) {
            return Err(ConfigValidationError::InvalidTtl("challenge.ttl_secs"));
        }
        Ok(())
    }
}
