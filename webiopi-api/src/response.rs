//! Response writer
//!
//! Every response leaving the server is built here so the `Server` header,
//! cache policy and error page stay consistent.

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, SERVER, WWW_AUTHENTICATE};
use http::response::Builder;
use http::{Response, StatusCode};
use http_body_util::Full;
use hyper::ext::ReasonPhrase;
use webiopi_core::HttpError;
use webiopi_static::ResolvedFile;

use crate::auth::BasicAuth;

/// Response type produced by the front-end
pub type HttpResponse = Response<Full<Bytes>>;

/// Content type used when the backend gives a body but no type
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Write a status/body/content-type triple
///
/// Codes from 400 up become an error page whose reason is `body`.
pub fn write(status: StatusCode, body: Option<String>, content_type: Option<&str>) -> HttpResponse {
    if status.as_u16() >= 400 {
        return error(status, body.as_deref());
    }

    let builder = base(status).header(CACHE_CONTROL, "no-cache");
    match body {
        Some(body) => finish(
            builder.header(CONTENT_TYPE, content_type.unwrap_or(DEFAULT_CONTENT_TYPE)),
            Bytes::from(body),
        ),
        None => finish(builder, Bytes::new()),
    }
}

/// Error page, with `reason` as the status line phrase when given
pub fn error(status: StatusCode, reason: Option<&str>) -> HttpResponse {
    let default_reason = status.canonical_reason().unwrap_or("Unknown");
    let message = reason.unwrap_or(default_reason);

    let page = format!(
        "<html><head><title>Error response</title></head><body>\
         <h1>Error response</h1><p>Error code: {}</p><p>Message: {}.</p>\
         </body></html>",
        status.as_u16(),
        escape_html(message)
    );

    let mut response = finish(
        base(status).header(CONTENT_TYPE, "text/html; charset=utf-8"),
        Bytes::from(page),
    );

    if let Some(reason) = reason {
        if let Ok(phrase) = ReasonPhrase::try_from(reason.as_bytes().to_vec()) {
            response.extensions_mut().insert(phrase);
        }
    }
    response
}

/// 301 to `location`
pub fn redirect(location: &str) -> HttpResponse {
    finish(
        base(StatusCode::MOVED_PERMANENTLY).header(LOCATION, location),
        Bytes::new(),
    )
}

/// 401 with the Basic challenge
pub fn challenge() -> HttpResponse {
    finish(
        base(StatusCode::UNAUTHORIZED).header(WWW_AUTHENTICATE, BasicAuth::challenge()),
        Bytes::new(),
    )
}

/// 200 carrying a static file
pub fn file(file: ResolvedFile) -> HttpResponse {
    finish(
        base(StatusCode::OK).header(CONTENT_TYPE, file.mime_type),
        Bytes::from(file.content),
    )
}

/// Response for a per-request failure
pub fn from_error(err: &HttpError) -> HttpResponse {
    match err {
        HttpError::AuthenticationRequired => challenge(),
        other => error(other.status(), other.public_reason().as_deref()),
    }
}

fn base(status: StatusCode) -> Builder {
    Response::builder()
        .status(status)
        .header(SERVER, webiopi_core::version_string())
}

/// Build the response; a bad header value from the backend becomes a 500
fn finish(builder: Builder, body: Bytes) -> HttpResponse {
    match builder.body(Full::new(body)) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build response: {}", e);
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
