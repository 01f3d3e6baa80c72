//! WebIOPi HTTP front-end
//!
//! One listening port serving the REST backend, Basic authentication and
//! static files from the document roots.

pub mod auth;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use auth::BasicAuth;
pub use request::{IncomingRequest, ParsedTarget};
pub use router::RequestRouter;
pub use server::HttpServer;
