//! Error types for AgniNav

use thiserror::Error;

/// AgniNav error type
#[derive(Error, Debug)]
pub enum AgniError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<toml::de::Error> for AgniError {
    fn from(e: toml::de::Error) -> Self {
        AgniError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgniError>;
