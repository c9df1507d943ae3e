//! Error types for callscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallscribeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Recognition engine errors
    #[error("Engine failed to start for {label}: {message}")]
    EngineStart { label: String, message: String },

    #[error("Engine did not confirm startup for {label} within {timeout_ms}ms")]
    EngineStartTimeout { label: String, timeout_ms: u64 },

    #[error("Engine push failed: {message}")]
    EnginePush { message: String },

    #[error("Engine stop failed: {message}")]
    EngineStop { message: String },

    // Media subscription errors
    #[error("Invalid subscription: {message}")]
    InvalidSubscription { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CallscribeError>;
