//! Static file resolver
//!
//! A request path is looked up in three places, in order: the configured
//! document root, the process working directory, and the system document
//! root. Whatever matches first must canonicalize into one of those roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use webiopi_core::config::ServerConfig;
use webiopi_core::HttpError;

use crate::mime::guess_mime_type;

/// A file ready to be sent
#[derive(Debug)]
pub struct ResolvedFile {
    /// Canonical absolute path
    pub path: PathBuf,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Resolves relative request paths to files under the permitted roots
#[derive(Debug, Clone)]
pub struct FileResolver {
    config: Arc<ServerConfig>,
}

impl FileResolver {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }

    /// Resolve and read the file for `relative`
    pub async fn resolve(&self, relative: &str) -> Result<ResolvedFile, HttpError> {
        let relative = if relative.is_empty() {
            self.config.index.as_str()
        } else {
            relative
        };

        // Source files are refused whether or not they exist
        if self.config.is_restricted(relative) {
            return Err(HttpError::not_authorized());
        }

        let candidate = self.find_candidate(relative).await.ok_or(HttpError::NotFound)?;
        let mut real = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| HttpError::NotFound)?;

        tracing::debug!("📁 Resolving request: {} -> {:?}", relative, real);

        self.check_permitted(&real).await?;

        let metadata = tokio::fs::metadata(&real).await?;
        if metadata.is_dir() {
            // No directory listings
            real = tokio::fs::canonicalize(real.join(&self.config.index))
                .await
                .map_err(|_| HttpError::not_authorized())?;
            self.check_permitted(&real).await?;
        }

        let content = tokio::fs::read(&real).await?;
        let mime_type = guess_mime_type(&real);

        Ok(ResolvedFile {
            path: real,
            mime_type,
            content,
        })
    }

    /// First existing candidate in search order
    async fn find_candidate(&self, relative: &str) -> Option<PathBuf> {
        let candidates = [
            self.config.doc_root.join(relative),
            PathBuf::from(relative),
            self.config.system_root.join(relative),
        ];

        for candidate in candidates {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    /// Traversal guard plus the restricted extension check on the real path
    async fn check_permitted(&self, real: &Path) -> Result<(), HttpError> {
        let name = real.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if self.config.is_restricted(&name) {
            tracing::debug!("Refusing restricted file {:?}", real);
            return Err(HttpError::not_authorized());
        }

        let roots = self.permitted_roots().await;
        if roots.iter().any(|root| real.starts_with(root)) {
            Ok(())
        } else {
            tracing::warn!("Refusing path outside document roots: {:?}", real);
            Err(HttpError::not_authorized())
        }
    }

    /// Canonical forms of the roots that currently exist
    async fn permitted_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::with_capacity(3);
        let cwd = std::env::current_dir().ok();

        let sources = [
            Some(self.config.doc_root.clone()),
            cwd,
            Some(self.config.system_root.clone()),
        ];

        for root in sources.into_iter().flatten() {
            if let Ok(canonical) = tokio::fs::canonicalize(&root).await {
                roots.push(canonical);
            }
        }
        roots
    }
}
