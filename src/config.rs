//! Configuration types, built from environment variables.
//!
//! Config is constructed once at startup and handed into constructors.
//! The core never reads the environment on its own.

use secrecy::SecretString;

use crate::error::ConfigError;

/// SMTP transport configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from environment variables.
    ///
    /// `SMTP_HOST` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| ConfigError::MissingEnvVar("SMTP_HOST".into()))?;

        let port: u16 = match std::env::var("SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SMTP_PORT".into(),
                message: format!("not a valid port: {raw}"),
            })?,
            Err(_) => 587,
        };

        let username = std::env::var("SMTP_USER").unwrap_or_default();
        let password = std::env::var("SMTP_PASS").unwrap_or_default();
        let from_address = std::env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());

        Ok(Self {
            host,
            port,
            username,
            password,
            from_address,
        })
    }
}

/// AI provider configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Chat-completions endpoint (OpenAI-compatible).
    pub api_url: String,
    pub api_key: SecretString,
    pub model: String,
}

impl AiConfig {
    /// Build config from environment variables.
    /// Returns `None` if `OPENAI_API_KEY` is not set (refiner runs
    /// heuristics-only).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;

        let api_url = std::env::var("OPENAI_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());

        let model = std::env::var("MAILHUB_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Some(Self {
            api_url,
            api_key: SecretString::from(api_key),
            model,
        })
    }
}
