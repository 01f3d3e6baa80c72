//! HTTP Basic authentication
//!
//! The server never stores the password. It keeps the SHA-256 digest of the
//! base64 credential a client puts after `Basic `, and compares digests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use webiopi_core::config::AuthDigest;

/// Realm announced in the `WWW-Authenticate` challenge
pub const REALM: &str = "webiopi";

/// Basic auth gate
#[derive(Debug, Clone, Default)]
pub struct BasicAuth {
    digest: Option<AuthDigest>,
}

impl BasicAuth {
    /// Create a gate; `None` lets every request through
    pub fn new(digest: Option<AuthDigest>) -> Self {
        Self { digest }
    }

    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Validate an `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> bool {
        let Some(expected) = &self.digest else {
            return true;
        };
        let Some(credential) = header.and_then(|h| h.strip_prefix("Basic ")) else {
            return false;
        };

        let hash = Sha256::digest(credential.as_bytes());
        constant_time_eq(hash.as_slice(), expected.as_bytes())
    }

    /// `WWW-Authenticate` header value
    pub fn challenge() -> String {
        format!("Basic realm=\"{}\"", REALM)
    }

    /// Digest matching a client that authenticates as `login:password`
    pub fn digest_for(login: &str, password: &str) -> AuthDigest {
        let credential = STANDARD.encode(format!("{}:{}", login, password));
        let hash = Sha256::digest(credential.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(hash.as_slice());
        AuthDigest::from_bytes(bytes)
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
