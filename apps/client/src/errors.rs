use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Client-level error type.
/// Every variant maps to a stable code and a single user-facing notification.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The server refused the stored token on a protected call.
    #[error("Session rejected: {0}")]
    SessionRejected(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Missing resume")]
    MissingResume,

    #[error("Missing profile id: fetch the profile before updating it")]
    MissingProfileId,

    #[error("Already applied: {0}")]
    AlreadyApplied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// The one message shown to the user when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Unauthenticated => "UNAUTHENTICATED",
            ClientError::Authentication(_) => "AUTHENTICATION_FAILED",
            ClientError::SessionRejected(_) => "SESSION_REJECTED",
            ClientError::Validation { .. } => "VALIDATION_ERROR",
            ClientError::MissingResume => "MISSING_RESUME",
            ClientError::MissingProfileId => "MISSING_PROFILE_ID",
            ClientError::AlreadyApplied(_) => "ALREADY_APPLIED",
            ClientError::NotFound(_) => "NOT_FOUND",
            ClientError::Server { .. } => "SERVER_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True for failures detected locally, before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthenticated | ClientError::MissingResume | ClientError::MissingProfileId
        )
    }

    pub fn notification(&self) -> Notification {
        let (title, message) = match self {
            ClientError::Network(e) => {
                tracing::error!("Network error: {e}");
                (
                    "Connection Error",
                    "Could not reach the server. Check your connection and try again.".to_string(),
                )
            }
            ClientError::Unauthenticated => ("Error", "You are not logged in.".to_string()),
            ClientError::Authentication(msg) => ("Login Failed", msg.clone()),
            ClientError::SessionRejected(msg) => ("Session Expired", msg.clone()),
            ClientError::Validation { message, .. } => ("Invalid Input", message.clone()),
            ClientError::MissingResume => (
                "Missing Resume",
                "Please attach a resume before applying.".to_string(),
            ),
            ClientError::MissingProfileId => (
                "Error",
                "Your profile has not been loaded yet.".to_string(),
            ),
            ClientError::AlreadyApplied(msg) => ("Already Applied", msg.clone()),
            ClientError::NotFound(msg) => ("Not Found", msg.clone()),
            ClientError::Server { status, message } => {
                tracing::error!("Server error {status}: {message}");
                ("Error", message.clone())
            }
            ClientError::Decode(e) => {
                tracing::error!("Decode error: {e}");
                (
                    "Error",
                    "The server sent a response we could not understand.".to_string(),
                )
            }
            ClientError::Storage(e) => {
                tracing::error!("Token storage error: {e}");
                (
                    "Error",
                    "Could not access secure storage on this device.".to_string(),
                )
            }
        };

        Notification {
            title: title.to_string(),
            message,
        }
    }
}
