//! Error types for the dino-rl core library

use thiserror::Error;

/// Core error type for learning-loop operations
#[derive(Error, Debug)]
pub enum RLError {
    /// The oracle rejected a predict or train call
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Agent lifecycle misuse (e.g. a frame before the first reset)
    #[error("Agent error: {0}")]
    Agent(String),

    /// Hook invoked with an agent id the controller never registered
    #[error("Unknown agent: {0}")]
    UnknownAgent(usize),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RLError {
    /// Build an oracle error from anything displayable
    pub fn oracle(msg: impl std::fmt::Display) -> Self {
        Self::Oracle(msg.to_string())
    }
}

/// Result type alias for learning-loop operations
pub type Result<T> = std::result::Result<T, RLError>;
