//! Configuration loader

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for TOML and JSON files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        tracing::debug!("Loading {} configuration from {}", ext, path.display());

        match ext {
            "json" => Self::from_json(&content),
            "toml" | "conf" => Self::from_toml(&content),
            _ => Err(Error::Config(format!("Unknown config format: {}", ext))),
        }
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<ServerConfig> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<ServerConfig> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServeMode;
    use std::io::Write;

    #[test]
    fn test_json_loading() {
        let json = r#"{"port": 8080, "context": "webiopi"}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.context.as_str(), "/webiopi/");
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_toml_loading() {
        let digest = "0f".repeat(32);
        let toml = format!(
            r#"
            host = "127.0.0.1"
            port = 9000
            doc_root = "/srv/www"
            index = "home.html"
            auth = "{}"
            serve_mode = "per_connection"
            "#,
            digest
        );
        let config = ConfigLoader::from_toml(&toml).unwrap();
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
        assert_eq!(config.index, "home.html");
        assert_eq!(config.serve_mode, ServeMode::PerConnection);
        assert_eq!(config.auth.unwrap().to_hex(), digest);
    }

    #[test]
    fn test_empty_digest_disables_auth() {
        let config = ConfigLoader::from_toml(r#"auth = """#).unwrap();
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_bad_digest_rejected() {
        let err = ConfigLoader::from_toml(r#"auth = "not-hex""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "port = 8123").unwrap();
        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.port, 8123);
    }

    #[test]
    fn test_unknown_format() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(ConfigLoader::load(file.path()), Err(Error::Config(_))));
    }
}
