//! Application configuration loaded from environment variables.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::path::PathBuf;

pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 3000;
    pub const OMDB_BASE_URL: &str = "http://www.omdbapi.com/";
}

/// The cookie encryption key needs at least this many bytes of secret.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

/// Google OAuth client registration.
#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Must match the redirect URI registered with Google, e.g.
    /// `https://example.com/auth/google/secrets`.
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct OmdbSettings {
    pub base_url: String,
    pub api_key: SecretString,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory of the sled database.
    pub database_path: PathBuf,
    pub session_secret: SecretString,
    /// Only send the session cookie over HTTPS.
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub google: GoogleSettings,
    pub omdb: OmdbSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `DATABASE_PATH`, `SESSION_SECRET`, `GOOGLE_CLIENT_ID`,
    /// `GOOGLE_CLIENT_SECRET`, `GOOGLE_CALLBACK_URL`, `OMDB_API_KEY`.
    ///
    /// Optional: `HOST` (0.0.0.0), `PORT` (3000), `OMDB_BASE_URL`,
    /// `COOKIE_SECURE` (false), `BCRYPT_COST` (bcrypt's default cost).
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| defaults::HOST.to_string());

        let port = match env::var("PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue("PORT must be a valid port number"))?,
            Err(_) => defaults::PORT,
        };

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(value) => parse_bool(&value)
                .ok_or(ConfigError::InvalidValue("COOKIE_SECURE must be true or false"))?,
            Err(_) => false,
        };

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(cost) => cost
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::InvalidValue(
                    "BCRYPT_COST must be a number between 4 and 31",
                ))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let config = Config {
            host,
            port,
            database_path: PathBuf::from(required("DATABASE_PATH")?),
            session_secret: SecretString::from(required("SESSION_SECRET")?),
            cookie_secure,
            bcrypt_cost,
            google: GoogleSettings {
                client_id: required("GOOGLE_CLIENT_ID")?,
                client_secret: SecretString::from(required("GOOGLE_CLIENT_SECRET")?),
                callback_url: required("GOOGLE_CALLBACK_URL")?,
            },
            omdb: OmdbSettings {
                base_url: env::var("OMDB_BASE_URL")
                    .unwrap_or_else(|_| defaults::OMDB_BASE_URL.to_string()),
                api_key: SecretString::from(required("OMDB_API_KEY")?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.expose_secret().len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET must be at least 64 bytes long",
            ));
        }
        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),
}
