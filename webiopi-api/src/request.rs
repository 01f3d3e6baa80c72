//! Request line parsing
//!
//! Turns a request target into the relative path the backend and file
//! resolver work with, plus its query parameters.

use http::Method;
use std::collections::HashMap;
use webiopi_core::config::ContextPrefix;

/// Query key carrying the compact response hint
pub const COMPACT_KEY: &str = "compact";

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: Method,
    /// Target as received, including the query string
    pub raw_path: String,
    /// Path with context prefix and leading slash removed
    pub relative_path: String,
    /// A key without `=` maps to `None`
    pub query: HashMap<String, Option<String>>,
    pub compact: bool,
}

/// Outcome of parsing a request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTarget {
    /// Bare context name; send the client to `location`
    Redirect(String),
    Request(IncomingRequest),
}

impl IncomingRequest {
    /// Parse `target` (path and query) relative to `context`
    pub fn parse(method: Method, target: &str, context: &ContextPrefix) -> ParsedTarget {
        // Split the query off before stripping the context so only the path
        // is rewritten; a context string inside a query value stays intact.
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        let stripped = match path.strip_prefix(context.as_str()) {
            Some(rest) => format!("/{}", rest),
            None => path.to_string(),
        };
        let relative = stripped.strip_prefix('/').unwrap_or(stripped.as_str());

        if context.bare_name() == Some(relative) {
            return ParsedTarget::Redirect("/".to_string());
        }

        let query = query.map(parse_query).unwrap_or_default();
        let compact = query
            .get(COMPACT_KEY)
            .and_then(|v| v.as_deref())
            .is_some_and(parse_bool);

        ParsedTarget::Request(IncomingRequest {
            method,
            raw_path: target.to_string(),
            relative_path: relative.to_string(),
            query,
            compact,
        })
    }
}

/// Parse `a=1&b&c=` style query strings
///
/// Tokens are split on the first `=`. Empty tokens and empty keys are
/// skipped. A repeated key keeps its last value.
pub fn parse_query(query: &str) -> HashMap<String, Option<String>> {
    let mut params = HashMap::new();
    for token in query.split('&') {
        match token.split_once('=') {
            Some(("", _)) => continue,
            Some((key, value)) => {
                params.insert(key.to_string(), Some(value.to_string()));
            }
            None if token.is_empty() => continue,
            None => {
                params.insert(token.to_string(), None);
            }
        }
    }
    params
}

/// Permissive boolean: `true`, `1` and `yes` in any case
pub fn parse_bool(value: &str) -> bool {
    ["true", "1", "yes"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
