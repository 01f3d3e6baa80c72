//! Error types for WebIOPi

use http::StatusCode;
use thiserror::Error;

/// Result type for WebIOPi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Server-level error type
///
/// These end the listener's life (or prevent it from starting). Anything
/// that goes wrong while serving a single request is an [`HttpError`].
#[derive(Error, Debug)]
pub enum Error {
    /// The listen address is already bound by someone else
    #[error("Address already in use: {0}")]
    AddressInUse(String),

    /// Not allowed to bind the listen address (e.g. privileged port)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// `start` called on a server that is already running
    #[error("Server is already running")]
    AlreadyRunning,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Accept loop failure
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-request failure, always converted to a response
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Not Found")]
    NotFound,

    /// Access refused; the message is sent to the client
    #[error("{0}")]
    Forbidden(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Payload Too Large")]
    PayloadTooLarge,

    /// Server-side fault; the detail is logged, never sent
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    /// The generic refusal used for traversal and restricted files
    pub fn not_authorized() -> Self {
        HttpError::Forbidden("Not Authorized".to_string())
    }

    /// Status code sent for this error
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text that may be shown to the client, if any
    pub fn public_reason(&self) -> Option<String> {
        match self {
            HttpError::Forbidden(reason) => Some(reason.clone()),
            HttpError::NotFound => Some("Not Found".to_string()),
            HttpError::Internal(_) | HttpError::AuthenticationRequired => None,
            HttpError::MethodNotAllowed | HttpError::PayloadTooLarge => None,
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(e: std::io::Error) -> Self {
        HttpError::Internal(e.to_string())
    }
}
