//! Error types for tailfinder.
//!
//! This module defines the crate-wide error type. Failures of an individual
//! aircraft lookup are not errors of the application; they are a settled
//! state of the details view, see [`crate::classify::LookupError`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tailfinder operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// User input failed validation. Never reaches the network.
    #[error("{message}")]
    Validation {
        /// The notification shown to the user.
        message: String,
    },

    /// A date could not be parsed.
    #[error("invalid date '{input}': expected YYYY-MM-DD or an RFC 3339 date-time")]
    InvalidDate {
        /// The rejected input.
        input: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the preference database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === HTTP Errors ===
    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tailfinder operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Check if this error was caused by bad user input.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidDate { .. })
    }
}
