//! Error types and handling for the `dresscast` backend

use thiserror::Error;

/// Main error type for the `dresscast` backend
#[derive(Error, Debug)]
pub enum DresscastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Inbound request validation errors (never retried)
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Transport or model service errors from a single generation call
    #[error("Model error: {message}")]
    Model { message: String },

    /// The retry orchestrator exhausted all attempts
    #[error("Failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl DresscastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(message: S) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Get the message that is safe to return to an HTTP client.
    ///
    /// Validation messages describe the caller's own input and are returned
    /// verbatim; everything else collapses to a generic message so model and
    /// transport internals stay in the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            DresscastError::Validation { message } => format!("Invalid input: {message}"),
            DresscastError::Config { .. } => {
                "Service is misconfigured. Please try again later.".to_string()
            }
            DresscastError::Model { .. } | DresscastError::RetriesExhausted { .. } => {
                "Unable to generate suggestions right now. Please try again later.".to_string()
            }
        }
    }
}
