//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Web server (`StorefrontConfig`)
//!
//! ### Required
//! - `FRESHMALL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FRESHMALL_BASE_URL` - Public URL of the shop (used in activation links)
//! - `FRESHMALL_SECRET_KEY` - Token signing secret (min 32 chars, high entropy)
//!
//! ### Optional
//! - `FRESHMALL_HOST` - Bind address (default: 127.0.0.1)
//! - `FRESHMALL_PORT` - Listen port (default: 8000)
//! - `FRESHMALL_CACHE_REDIS_URL` - Cache database (default: redis://127.0.0.1:6379/2)
//! - `FRESHMALL_SESSION_REDIS_URL` - Session database (default: redis://127.0.0.1:6379/1)
//! - `FRESHMALL_BROKER_URL` - Task broker (default: redis://127.0.0.1:6379/3)
//! - `FRESHMALL_RESULT_BACKEND_URL` - Task results (default: redis://127.0.0.1:6379/4)
//! - `FRESHMALL_MEDIA_ROOT` - Directory for uploaded media (default: media)
//! - `FRESHMALL_MEDIA_URL` - Public prefix for media files (default: /media)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Worker (`WorkerConfig`)
//!
//! - `FRESHMALL_BASE_URL`, `FRESHMALL_BROKER_URL`, `FRESHMALL_RESULT_BACKEND_URL` - as above
//! - `FRESHMALL_WORKER_CONCURRENCY` - Concurrent consumers (default: 4)
//! - `SMTP_HOST` (required), `SMTP_PORT` (default: 25), `SMTP_USERNAME` (required),
//!   `SMTP_PASSWORD` (required), `SMTP_STARTTLS` (default: true)
//! - `EMAIL_FROM` - Sender shown to recipients (required, e.g. `FreshMall <noreply@freshmall.cn>`)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SECRET_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_CACHE_REDIS_URL: &str = "redis://127.0.0.1:6379/2";
const DEFAULT_SESSION_REDIS_URL: &str = "redis://127.0.0.1:6379/1";
const DEFAULT_BROKER_URL: &str = "redis://127.0.0.1:6379/3";
const DEFAULT_RESULT_BACKEND_URL: &str = "redis://127.0.0.1:6379/4";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the shop
    pub base_url: String,
    /// Signing secret for activation tokens
    pub secret_key: SecretString,
    /// Redis logical databases
    pub redis: RedisConfig,
    /// Uploaded media storage
    pub media: MediaConfig,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Redis connection URLs, one per logical database.
///
/// Implements `Debug` manually because URLs may embed a password.
#[derive(Clone)]
pub struct RedisConfig {
    /// View cache and browsing history
    pub cache_url: SecretString,
    /// Login sessions
    pub session_url: SecretString,
    /// Task broker queue
    pub broker_url: SecretString,
    /// Task result backend
    pub result_backend_url: SecretString,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("cache_url", &"[REDACTED]")
            .field("session_url", &"[REDACTED]")
            .field("broker_url", &"[REDACTED]")
            .field("result_backend_url", &"[REDACTED]")
            .finish()
    }
}

/// Uploaded media storage configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory files are written to
    pub root: PathBuf,
    /// Public URL prefix for stored files (a path such as `/media` or an absolute URL)
    pub url: String,
}

/// Sentry configuration. Error tracking is disabled when `dsn` is unset.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN
    pub dsn: Option<String>,
    /// Environment tag (e.g. production, staging)
    pub environment: Option<String>,
    /// Error event sample rate (0.0 - 1.0)
    pub sample_rate: f32,
    /// Performance trace sample rate (0.0 - 1.0)
    pub traces_sample_rate: f32,
}

/// Background worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Public base URL for the shop (used in activation links)
    pub base_url: String,
    /// Task broker queue
    pub broker_url: SecretString,
    /// Task result backend
    pub result_backend_url: SecretString,
    /// Number of concurrent consumers
    pub concurrency: usize,
    /// Outbound e-mail
    pub email: EmailConfig,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// SMTP account
    pub smtp_username: String,
    /// SMTP client authorization password
    pub smtp_password: SecretString,
    /// Upgrade the connection with STARTTLS
    pub smtp_starttls: bool,
    /// Sender shown to recipients
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("smtp_starttls", &self.smtp_starttls)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the secret key fails validation (length, placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("FRESHMALL_DATABASE_URL")?;
        let host = get_env_or_default("FRESHMALL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHMALL_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or_default("FRESHMALL_PORT", 8000_u16)?;
        let base_url = get_base_url()?;
        let secret_key = get_validated_secret("FRESHMALL_SECRET_KEY")?;
        validate_secret_length(&secret_key, "FRESHMALL_SECRET_KEY")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            secret_key,
            redis: RedisConfig::from_env(),
            media: MediaConfig::from_env(),
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the shop is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl RedisConfig {
    fn from_env() -> Self {
        Self {
            cache_url: get_secret_or_default("FRESHMALL_CACHE_REDIS_URL", DEFAULT_CACHE_REDIS_URL),
            session_url: get_secret_or_default(
                "FRESHMALL_SESSION_REDIS_URL",
                DEFAULT_SESSION_REDIS_URL,
            ),
            broker_url: get_secret_or_default("FRESHMALL_BROKER_URL", DEFAULT_BROKER_URL),
            result_backend_url: get_secret_or_default(
                "FRESHMALL_RESULT_BACKEND_URL",
                DEFAULT_RESULT_BACKEND_URL,
            ),
        }
    }
}

impl MediaConfig {
    fn from_env() -> Self {
        Self {
            root: PathBuf::from(get_env_or_default("FRESHMALL_MEDIA_ROOT", "media")),
            url: get_env_or_default("FRESHMALL_MEDIA_URL", "/media"),
        }
    }

    /// Load only the media settings (used by the CLI).
    #[must_use]
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    /// The local path the media directory is served under, if the media URL
    /// is a path on this server rather than an external host.
    #[must_use]
    pub fn local_mount(&self) -> Option<&str> {
        let path = self.url.trim_end_matches('/');
        (path.starts_with('/') && path.len() > 1).then_some(path)
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        })
    }
}

impl WorkerConfig {
    /// Load worker configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let concurrency = parse_env_or_default("FRESHMALL_WORKER_CONCURRENCY", 4_usize)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FRESHMALL_WORKER_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            base_url: get_base_url()?,
            broker_url: get_secret_or_default("FRESHMALL_BROKER_URL", DEFAULT_BROKER_URL),
            result_backend_url: get_secret_or_default(
                "FRESHMALL_RESULT_BACKEND_URL",
                DEFAULT_RESULT_BACKEND_URL,
            ),
            concurrency,
            email: EmailConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env_or_default("SMTP_PORT", 25_u16)?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            smtp_starttls: parse_env_or_default("SMTP_STARTTLS", true)?,
            from_address: get_required_env("EMAIL_FROM")?,
        })
    }
}

/// Load the broker and result backend URLs only (used by the CLI).
#[must_use]
pub fn task_backend_urls() -> (SecretString, SecretString) {
    let _ = dotenvy::dotenv();
    (
        get_secret_or_default("FRESHMALL_BROKER_URL", DEFAULT_BROKER_URL),
        get_secret_or_default("FRESHMALL_RESULT_BACKEND_URL", DEFAULT_RESULT_BACKEND_URL),
    )
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional secret with a default value.
fn get_secret_or_default(key: &str, default: &str) -> SecretString {
    SecretString::from(get_env_or_default(key, default))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
pub(crate) fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Load the database URL only (used by the CLI).
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("FRESHMALL_DATABASE_URL")
}

/// Get the public base URL without a trailing slash.
fn get_base_url() -> Result<String, ConfigError> {
    let value = get_required_env("FRESHMALL_BASE_URL")?;
    url::Url::parse(&value).map_err(|e| {
        ConfigError::InvalidEnvVar("FRESHMALL_BASE_URL".to_string(), e.to_string())
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using a default when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SECRET_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SECRET_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
