//! Demo REST backend
//!
//! Stands in for the GPIO layer so the binary is useful on its own.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use webiopi_core::{BackendHandler, HandlerError, HandlerOutcome, HandlerResult};

/// Longest `delay/<ms>` accepted
const MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Serialize)]
struct Status {
    version: String,
    uptime_secs: u64,
}

/// Answers `version`, `status`, `delay/<ms>` and `echo`
pub struct DemoHandler {
    started: Instant,
}

impl DemoHandler {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn status(&self, compact: bool) -> HandlerResult {
        let status = Status {
            version: webiopi_core::version_string(),
            uptime_secs: self.started.elapsed().as_secs(),
        };
        let json = if compact {
            serde_json::to_string(&status)
        } else {
            serde_json::to_string_pretty(&status)
        }
        .map_err(|e| HandlerError::Internal(e.to_string()))?;
        Ok(HandlerOutcome::json(json))
    }

    async fn delay(&self, value: &str) -> HandlerResult {
        let ms: u64 = value
            .parse()
            .map_err(|_| HandlerError::InvalidParameter(format!("Invalid delay {}", value)))?;
        if ms > MAX_DELAY_MS {
            return Err(HandlerError::InvalidParameter(format!(
                "Delay {} exceeds {}ms",
                ms, MAX_DELAY_MS
            )));
        }
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(HandlerOutcome::ok(ms.to_string()))
    }
}

impl Default for DemoHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendHandler for DemoHandler {
    async fn handle_get(&self, path: &str, compact: bool) -> HandlerResult {
        if let Some(value) = path.strip_prefix("delay/") {
            return self.delay(value).await;
        }
        match path {
            "version" => Ok(HandlerOutcome::ok(webiopi_core::version_string())),
            "status" => self.status(compact),
            _ => Ok(HandlerOutcome::Unhandled),
        }
    }

    async fn handle_post(&self, path: &str, body: Bytes, _compact: bool) -> HandlerResult {
        match path {
            "echo" => Ok(HandlerOutcome::ok(String::from_utf8_lossy(&body).into_owned())),
            _ => Ok(HandlerOutcome::Unhandled),
        }
    }
}
