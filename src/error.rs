use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Session {0} is already running")]
    SessionActive(Uuid),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Session log export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Session log is empty, nothing to export")]
    EmptyLog,
    #[error("Export directory unavailable: {0}")]
    Directory(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("Invalid listen address {addr}: {source}")]
    Address {
        addr: String,
        source: std::net::AddrParseError,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Load(Box::new(error))
    }
}
