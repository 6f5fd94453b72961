//! Error types for the conference booking Lambda functions.

use std::collections::BTreeMap;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation messages keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors that can occur in the booking and weather Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// DynamoDB error
    #[error("DynamoDB error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation error
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Authentication error (missing, expired or wrong kind of token)
    #[error("{0}")]
    Auth(String),

    /// Token could not be verified
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Authorization error
    #[error("{0}")]
    Unauthorized(String),

    /// Not found error
    #[error("{0}")]
    NotFound(String),

    /// Conflicting write
    #[error("{0}")]
    Conflict(String),

    /// A downstream service failed or answered unexpectedly
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 422,
            Error::Auth(_) | Error::InvalidToken(_) => 401,
            Error::Unauthorized(_) => 403,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Upstream(_) => 502,
            Error::Serialization(_) => 400,
            Error::Store(_) | Error::Config(_) => 500,
        }
    }

    /// Single-field validation error.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Error::Validation(errors)
    }
}

/// Request fields whose JSON name differs from the Rust field name.
/// `validator` reports errors under the Rust name.
const WIRE_NAMES: &[(&str, &str)] = &[("room_name", "roomName"), ("user_id", "userId")];

fn wire_name(field: &str) -> &str {
    WIRE_NAMES
        .iter()
        .find(|(rust, _)| *rust == field)
        .map_or(field, |(_, wire)| *wire)
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let field = wire_name(&field);
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("The {} field is invalid.", field))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Error::Validation(fields)
    }
}
