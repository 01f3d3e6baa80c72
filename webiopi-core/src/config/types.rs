//! Configuration type definitions
//!
//! These types represent the runtime configuration for the WebIOPi HTTP
//! front-end. A `ServerConfig` is built once at startup and shared read-only.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Error;

/// Where the packaged web UI is installed
pub const SYSTEM_DOC_ROOT: &str = "/usr/share/webiopi/htdocs";

/// HTTP front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL prefix the API is mounted under
    #[serde(default)]
    pub context: ContextPrefix,

    /// Document root searched first for static files
    #[serde(default = "default_doc_root")]
    pub doc_root: PathBuf,

    /// File served for empty paths and directories
    #[serde(default = "default_index")]
    pub index: String,

    /// SHA-256 digest of the Basic credential; `None` disables auth
    #[serde(default, deserialize_with = "deserialize_digest")]
    pub auth: Option<AuthDigest>,

    /// Last document root in the search path
    #[serde(default = "default_system_root")]
    pub system_root: PathBuf,

    /// File extensions never served verbatim
    #[serde(default = "default_restricted_extensions")]
    pub restricted_extensions: Vec<String>,

    /// Connection scheduling
    #[serde(default)]
    pub serve_mode: ServeMode,

    /// Maximum POST body size in bytes (default: 1MB)
    #[serde(default = "default_body_limit")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            context: ContextPrefix::default(),
            doc_root: default_doc_root(),
            index: default_index(),
            auth: None,
            system_root: default_system_root(),
            restricted_extensions: default_restricted_extensions(),
            serve_mode: ServeMode::default(),
            max_body_size: default_body_limit(),
        }
    }
}

impl ServerConfig {
    /// Listen address as `host:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether `name` carries one of the restricted extensions
    pub fn is_restricted(&self, name: &str) -> bool {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return false;
        };
        self.restricted_extensions
            .iter()
            .any(|r| r.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_doc_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_index() -> String {
    "index.html".to_string()
}

fn default_system_root() -> PathBuf {
    PathBuf::from(SYSTEM_DOC_ROOT)
}

fn default_restricted_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_body_limit() -> usize {
    1024 * 1024 // 1MB
}

/// How accepted connections are scheduled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServeMode {
    /// One connection at a time, fully served before the next accept
    #[default]
    Serial,
    /// One tokio task per connection
    PerConnection,
}

/// URL context prefix, always of the form `/` or `/name/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContextPrefix(String);

impl ContextPrefix {
    /// Normalize a prefix so it starts and ends with `/`
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim();
        if trimmed.trim_matches('/').is_empty() {
            return Self("/".to_string());
        }
        let mut value = String::with_capacity(trimmed.len() + 2);
        if !trimmed.starts_with('/') {
            value.push('/');
        }
        value.push_str(trimmed);
        if !trimmed.ends_with('/') {
            value.push('/');
        }
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix without surrounding slashes, `None` for the root prefix
    pub fn bare_name(&self) -> Option<&str> {
        let name = self.0.trim_matches('/');
        (!name.is_empty()).then_some(name)
    }
}

impl Default for ContextPrefix {
    fn default() -> Self {
        Self("/".to_string())
    }
}

impl From<String> for ContextPrefix {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ContextPrefix {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ContextPrefix> for String {
    fn from(value: ContextPrefix) -> Self {
        value.0
    }
}

impl fmt::Display for ContextPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 digest of a Basic authentication credential
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct AuthDigest([u8; 32]);

impl AuthDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64 character hex digest
    pub fn from_hex(value: &str) -> Result<Self, Error> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(value.trim(), &mut bytes)
            .map_err(|e| Error::Config(format!("Invalid auth digest: {}", e)))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Keep the secret out of logs
impl fmt::Debug for AuthDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthDigest(..)")
    }
}

impl TryFrom<String> for AuthDigest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<AuthDigest> for String {
    fn from(value: AuthDigest) -> Self {
        value.to_hex()
    }
}

/// An empty digest string disables authentication
fn deserialize_digest<'de, D>(deserializer: D) -> Result<Option<AuthDigest>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => AuthDigest::from_hex(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
