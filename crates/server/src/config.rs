//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOOKBAZAAR_DATABASE_URL` - `PostgreSQL` connection string
//! - `BOOKBAZAAR_SESSION_SECRET` - Session signing secret (min 64 chars)
//!
//! ## Optional
//! - `BOOKBAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BOOKBAZAAR_PORT` - Listen port (default: 3000)
//! - `BOOKBAZAAR_BASE_URL` - Public URL (default: `http://localhost:3000`)
//! - `BOOKBAZAAR_MIRROR_URL` - Redis endpoint for the secondary mirror store;
//!   when absent, mirror writes are disabled entirely
//! - `BOOKBAZAAR_NOTIFY_TOPIC` - Pub/sub channel for order notifications;
//!   when absent, notifications go to the log
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Signed session cookies require a 64-byte key.
const MIN_SESSION_SECRET_LENGTH: usize = 64;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// BookBazaar server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; https enables the Secure cookie flag
    pub base_url: String,
    /// Session cookie signing secret
    pub session_secret: SecretString,
    /// Secondary mirror store + notification topic configuration
    pub mirror: MirrorConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Secondary store and notification channel configuration.
///
/// Both pieces ride on the same Redis endpoint: the key-value mirror uses
/// the keyspace, the notification dispatcher uses pub/sub. Everything here
/// is optional - the store runs fine with no mirror at all.
#[derive(Debug, Clone, Default)]
pub struct MirrorConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`)
    pub url: Option<String>,
    /// Pub/sub channel name for order notifications
    pub notify_topic: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BOOKBAZAAR_DATABASE_URL")?;
        let host = get_env_or_default("BOOKBAZAAR_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BOOKBAZAAR_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("BOOKBAZAAR_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BOOKBAZAAR_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("BOOKBAZAAR_BASE_URL", "http://localhost:3000");
        let session_secret = get_validated_secret("BOOKBAZAAR_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "BOOKBAZAAR_SESSION_SECRET")?;

        let mirror = MirrorConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            mirror,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MirrorConfig {
    fn from_env() -> Self {
        Self {
            url: get_optional_env("BOOKBAZAAR_MIRROR_URL"),
            notify_topic: get_optional_env("BOOKBAZAAR_NOTIFY_TOPIC"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Validate that a secret is not an obvious placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-secret-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(64));
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(64)),
            mirror: MirrorConfig::default(),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_mirror_config_default_is_disabled() {
        let mirror = MirrorConfig::default();
        assert!(mirror.url.is_none());
        assert!(mirror.notify_topic.is_none());
    }
}
