// src/errors.rs
use thiserror::Error;

/// Run-level errors for the bulk user creator.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV file not found: {0}")]
    InputNotFound(String),

    #[error("Missing required columns: {missing:?} (available columns: {available:?})")]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Failed to initialize Firebase: {0}")]
    PlatformInit(String),

    #[error("Failed to generate credentials report: {0}")]
    ReportWrite(String),

    #[error("No users processed. Exiting.")]
    NothingProcessed,
}

/// Errors reported by the identity/document platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Email already exists")]
    EmailExists,

    #[error("{0}")]
    IdentityCreate(String),

    #[error("{0}")]
    ProfileWrite(String),

    #[error("{0}")]
    IdentityDelete(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
