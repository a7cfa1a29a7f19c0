//! Error types for MailHub.

use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors. A failed store write aborts the delivery sequence
/// immediately; no step continues past it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Email record not found: {id}")]
    NotFound { id: Uuid },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Mail transport errors — surfaced to callers as a structured failure
/// result, never as a panic.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    MessageBuild(String),

    #[error("SMTP connection failed: {0}")]
    Connection(String),

    #[error("SMTP send failed: {0}")]
    SendFailed(String),
}

/// AI provider errors — always recovered locally by the refiner, never
/// propagated past it.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned status {status}: {body}")]
    BadStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}
