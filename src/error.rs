//! Error types and result aliases for the observatory.
//!
//! This module defines the core error type [`ObservatoryError`] and the [`Result`] type
//! alias used throughout the crate. Storage failures are reported through this type at
//! the store boundary and are absorbed by the tracer; agent handler failures travel
//! back to the publisher unchanged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservatoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Reaper error: {0}")]
    Reaper(String),
}

pub type Result<T> = std::result::Result<T, ObservatoryError>;
