//! WebIOPi Core Library
//!
//! Configuration, error types and the backend handler contract shared by
//! the WebIOPi HTTP front-end crates.

pub mod config;
pub mod error;
pub mod handler;

pub use error::{Error, HttpError, Result};
pub use handler::{BackendHandler, HandlerError, HandlerOutcome, HandlerResponse, HandlerResult};

/// WebIOPi version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Value of the `Server` response header
pub fn version_string() -> String {
    format!("WebIOPi/{}/Rust", VERSION)
}
