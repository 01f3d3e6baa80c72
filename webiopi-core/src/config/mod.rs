//! Server configuration

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{AuthDigest, ContextPrefix, ServeMode, ServerConfig, SYSTEM_DOC_ROOT};
