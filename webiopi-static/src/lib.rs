//! WebIOPi Static File Module
//!
//! Resolves request paths against a layered document-root search path:
//! - Index file substitution
//! - Traversal guard over the permitted roots
//! - Restricted (server-side source) extensions
//! - MIME type detection

mod file_server;
mod mime;

pub use file_server::{FileResolver, ResolvedFile};
pub use mime::guess_mime_type;
