//! Request router
//!
//! Authorizes, parses and dispatches one request: backend handler first,
//! static files for unhandled GETs.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::header::AUTHORIZATION;
use http::{Method, Request};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use webiopi_core::config::ServerConfig;
use webiopi_core::{BackendHandler, HandlerOutcome, HandlerResult, HttpError};
use webiopi_static::FileResolver;

use crate::auth::BasicAuth;
use crate::request::{IncomingRequest, ParsedTarget};
use crate::response::{self, HttpResponse};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-request pipeline shared by every connection
pub struct RequestRouter {
    config: Arc<ServerConfig>,
    auth: BasicAuth,
    files: FileResolver,
    backend: Arc<dyn BackendHandler>,
}

impl RequestRouter {
    pub fn new(config: Arc<ServerConfig>, backend: Arc<dyn BackendHandler>) -> Self {
        Self {
            auth: BasicAuth::new(config.auth.clone()),
            files: FileResolver::new(config.clone()),
            config,
            backend,
        }
    }

    /// Handle a request; failures are turned into responses here
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let response = match self.route(req, &target).await {
            Ok(response) => response,
            Err(err) => {
                if let HttpError::Internal(detail) = &err {
                    tracing::error!("{} {} failed: {}", method, target, detail);
                }
                response::from_error(&err)
            }
        };

        tracing::debug!(target: "http", "\"{} {}\" {}", method, target, response.status().as_u16());
        response
    }

    async fn route<B>(&self, req: Request<B>, target: &str) -> Result<HttpResponse, HttpError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();

        let header = parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        if !self.auth.authorize(header) {
            return Err(HttpError::AuthenticationRequired);
        }

        let request = match IncomingRequest::parse(parts.method, target, &self.config.context) {
            ParsedTarget::Redirect(location) => return Ok(response::redirect(&location)),
            ParsedTarget::Request(request) => request,
        };
        let path = request.relative_path.as_str();

        let outcome = match request.method {
            Method::GET => {
                self.call_backend(self.backend.handle_get(path, request.compact)).await?
            }
            Method::POST => {
                let body = self.read_body(body).await?;
                self.call_backend(self.backend.handle_post(path, body, request.compact)).await?
            }
            _ => return Err(HttpError::MethodNotAllowed),
        };

        match outcome {
            HandlerOutcome::Handled(r) => Ok(response::write(r.status, r.body, r.content_type.as_deref())),
            HandlerOutcome::Unhandled if request.method == Method::GET => {
                let file = self.files.resolve(path).await?;
                Ok(response::file(file))
            }
            HandlerOutcome::Unhandled => Err(HttpError::NotFound),
        }
    }

    /// Run a backend call, classifying its failures
    async fn call_backend<F>(&self, call: F) -> Result<HandlerOutcome, HttpError>
    where
        F: Future<Output = HandlerResult>,
    {
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) if e.is_client_error() => Err(HttpError::Forbidden(e.to_string())),
            Ok(Err(e)) => Err(HttpError::Internal(e.to_string())),
            Err(_) => Err(HttpError::Internal("backend handler panicked".to_string())),
        }
    }

    async fn read_body<B>(&self, body: B) -> Result<Bytes, HttpError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(HttpError::PayloadTooLarge),
            Err(e) => Err(HttpError::Internal(format!("Failed to read request body: {}", e))),
        }
    }
}
