//! Backend handler contract
//!
//! The REST layer plugs into the HTTP front-end through [`BackendHandler`].
//! It either answers a request or reports it as unhandled so the front-end
//! can fall back to static file serving.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

/// Handler result
pub type HandlerResult = Result<HandlerOutcome, HandlerError>;

/// What the backend did with a request
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Not an API path; GET falls through to static files, POST gets 404
    Unhandled,
    /// The backend produced a response
    Handled(HandlerResponse),
}

/// Response from a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The target is not set up for this request (e.g. wrong pin function)
    #[error("{0}")]
    Config(String),

    /// A request parameter could not be used
    #[error("{0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Client input errors are answered with 403 and their message
    pub fn is_client_error(&self) -> bool {
        matches!(self, HandlerError::Config(_) | HandlerError::InvalidParameter(_))
    }
}

/// A code outside 100..=999 is a backend bug; answer 500 for it
fn status_from_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or_else(|_| {
        tracing::error!("Backend returned invalid status code {}", code);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

impl HandlerResponse {
    /// Create a simple response with status code
    pub fn status(code: u16) -> Self {
        Self {
            status: status_from_code(code),
            body: None,
            content_type: None,
        }
    }

    /// Create a plain-text response with body
    pub fn with_body(code: u16, body: impl Into<String>) -> Self {
        Self {
            status: status_from_code(code),
            body: Some(body.into()),
            content_type: Some("text/plain".to_string()),
        }
    }

    /// Set the content type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl HandlerOutcome {
    /// 200 with a plain-text body
    pub fn ok(body: impl Into<String>) -> Self {
        HandlerOutcome::Handled(HandlerResponse::with_body(200, body))
    }

    /// 200 with a JSON body
    pub fn json(body: impl Into<String>) -> Self {
        HandlerOutcome::Handled(HandlerResponse::with_body(200, body).content_type("application/json"))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, HandlerOutcome::Handled(_))
    }
}

impl From<HandlerResponse> for HandlerOutcome {
    fn from(response: HandlerResponse) -> Self {
        HandlerOutcome::Handled(response)
    }
}

/// REST layer consumed by the HTTP front-end
#[async_trait]
pub trait BackendHandler: Send + Sync {
    /// Handle a GET for `path` (relative, without context prefix or query)
    async fn handle_get(&self, path: &str, compact: bool) -> HandlerResult;

    /// Handle a POST for `path` with the full request body
    async fn handle_post(&self, path: &str, body: Bytes, compact: bool) -> HandlerResult;
}

/// Backend that handles nothing, turning the server into a file server
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackend;

#[async_trait]
impl BackendHandler for NoBackend {
    async fn handle_get(&self, _path: &str, _compact: bool) -> HandlerResult {
        Ok(HandlerOutcome::Unhandled)
    }

    async fn handle_post(&self, _path: &str, _body: Bytes, _compact: bool) -> HandlerResult {
        Ok(HandlerOutcome::Unhandled)
    }
}
