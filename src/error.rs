//! Error type shared by every stage of the digest pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// Missing or empty required file, bad config file, missing credential.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    /// The completion API failed or answered with something unusable.
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DigestError>;
